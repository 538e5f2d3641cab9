//! Pipeline entry points.
//!
//! - `run_schedule`: Fetch a team's schedule through the page's postback form

pub mod schedule;

pub use schedule::{RunContext, ScheduleRun, Stage, run_schedule};
