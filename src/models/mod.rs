// src/models/mod.rs

//! Domain models for the schedule crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod game;
mod selection;
mod state;

// Re-export all public types
pub use config::{Config, HttpConfig, ParseConfig, SiteConfig};
pub use game::{GameRecord, ScheduleBlock};
pub use selection::{ResolvedSelection, SelectableOption, SelectionKind};
pub use state::{
    EVENT_VALIDATION, HiddenStateBundle, VIEW_STATE, VIEW_STATE_FIELD_COUNT, VIEW_STATE_GENERATOR,
    view_state_field_name,
};
