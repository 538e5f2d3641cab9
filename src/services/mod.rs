//! Service layer for the schedule crawler.
//!
//! Each service consumes one scan of a page:
//! - Hidden-state extraction (`extract_hidden_state`)
//! - Season and team resolution (`resolve_season`, `resolve_team`)
//! - Postback assembly and submission (`build_form`, `build_request`, `submit`)
//! - Result table parsing (`parse_games`)

mod hidden_state;
mod options;
mod postback;
mod results;

pub use hidden_state::extract_hidden_state;
pub use options::{resolve_season, resolve_team};
pub use postback::{ASYNC_POST, EVENT_TARGET, PostbackForm, build_form, build_request, submit};
pub use results::{GameParser, check_async_error, parse_blocks, parse_games};
