//! Streaming HTML token scanner.
//!
//! - `Scanner`: lazy tokenizer over any `Read`
//! - `Token`: start/end/self-closing tag, text, or terminal error
//! - `ReplayableSource`: buffered body yielding fresh scans

mod source;
mod token;
mod tokenizer;

pub use source::ReplayableSource;
pub use token::{Attribute, Attributes, ScanError, Tag, Token};
pub use tokenizer::{Scanner, decode_entities};
