// src/error.rs

//! Unified error handling for the schedule crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Markup ended or broke before the needed element was found
    #[error("Malformed markup: {0}")]
    MalformedMarkup(String),

    /// An expected element or option is absent from the page
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server answered the postback with an AJAX error delta
    #[error("Postback rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Schedule text did not match the expected date/time layout
    #[error("Cannot parse '{text}': {message}")]
    Parse { text: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// A pipeline stage failed
    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a malformed-markup error.
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::MalformedMarkup(message.to_string())
    }

    /// Create a date/time parse error.
    pub fn parse(text: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            text: text.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an error with the pipeline stage it came from.
    pub fn in_stage(stage: &'static str, source: AppError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// Whether the error came from the network and may succeed on retry.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Status { .. } => true,
            Self::Stage { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// Name of the failed stage, if the error was raised by the pipeline.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
