//! Schedule blocks captured from the results table and the games built from them.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Text captured for one marker cell of the results table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleBlock {
    /// First non-blank text after the marker cell opened
    pub heading: String,

    /// Texts of the ordinary cells that follow, up to the next marker
    pub details: Vec<String>,
}

/// A scheduled game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub start_time: DateTime<FixedOffset>,
    pub opponent: String,
    pub location: String,
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start_time.format("%a %Y-%m-%d %H:%M %:z"))?;
        if !self.opponent.is_empty() {
            write!(f, " vs {}", self.opponent)?;
        }
        if !self.location.is_empty() {
            write!(f, " @ {}", self.location)?;
        }
        Ok(())
    }
}
