// src/utils/http.rs

//! HTTP transport: the client capability the pipeline is handed, a
//! `reqwest` implementation of it, and retry with backoff.

use std::future::Future;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::scanner::ReplayableSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request, independent of the HTTP library that sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A cookie set by the server, reduced to what is sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One `Set-Cookie` directive with the attributes that decide whether it is still live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub cookie: Cookie,
    pub expires: Option<SystemTime>,
    pub max_age: Option<Duration>,
}

impl SetCookie {
    fn from_response(cookie: &reqwest::cookie::Cookie<'_>) -> Self {
        Self {
            cookie: Cookie::new(cookie.name(), cookie.value()),
            expires: cookie.expires(),
            max_age: cookie.max_age(),
        }
    }

    /// Whether a browser would delete the cookie instead of storing it.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.max_age == Some(Duration::ZERO) || self.expires.is_some_and(|at| at <= now)
    }
}

/// Reduce the `Set-Cookie` directives of one response to the cookies to send back.
///
/// A later directive for the same name replaces an earlier one, and expired
/// directives delete the cookie.
pub fn live_cookies(
    directives: impl IntoIterator<Item = SetCookie>,
    now: SystemTime,
) -> Vec<Cookie> {
    let mut cookies: Vec<Cookie> = Vec::new();
    for directive in directives {
        let expired = directive.is_expired(now);
        cookies.retain(|c| c.name != directive.cookie.name);
        if expired {
            log::debug!("Dropping expired cookie {}", directive.cookie.name);
        } else {
            cookies.push(directive.cookie);
        }
    }
    cookies
}

/// Value for a `Cookie` request header, or `None` when there is nothing to send.
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    let pairs: Vec<String> = cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    Some(pairs.join("; "))
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: ReplayableSource,
    pub cookies: Vec<Cookie>,
}

/// Sends requests on behalf of the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the whole body.
    ///
    /// Non-success statuses are reported as [`AppError::Status`].
    async fn send(&self, request: &Request) -> Result<Page>;
}

/// [`Transport`] backed by a `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a client with the configured user agent and timeout.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Page> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(AppError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let directives: Vec<SetCookie> = response
            .cookies()
            .map(|c| SetCookie::from_response(&c))
            .collect();
        let cookies = live_cookies(directives, SystemTime::now());
        let body = response.bytes().await?;
        log::debug!("{} bytes from {}", body.len(), url);

        Ok(Page {
            url,
            status: status.as_u16(),
            body: ReplayableSource::new(body.to_vec()),
            cookies,
        })
    }
}

/// How often and how patiently transport failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op`, retrying transport failures with exponential backoff.
///
/// Any other error is returned immediately.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transport() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                log::warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    what,
                    e,
                    attempt,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Send `request` through `transport` under `policy`.
pub async fn send_with_retry(
    transport: &dyn Transport,
    policy: &RetryPolicy,
    request: &Request,
) -> Result<Page> {
    with_retry(policy, &request.url, move || transport.send(request)).await
}
