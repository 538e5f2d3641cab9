// src/scanner/source.rs

//! Replayable view over one buffered response body.

use std::borrow::Cow;
use std::sync::Arc;

use super::Scanner;

/// Captured body bytes that can be scanned from the start any number of times.
///
/// Clones share the same buffer. Each call to [`scan`](Self::scan) returns an
/// independent scanner positioned at byte zero; it is released when dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayableSource {
    bytes: Arc<[u8]>,
}

impl ReplayableSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Start a fresh scan from the beginning of the body.
    pub fn scan(&self) -> Scanner<&[u8]> {
        Scanner::new(&self.bytes[..])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for ReplayableSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for ReplayableSource {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl From<String> for ReplayableSource {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Token;

    #[test]
    fn test_each_scan_starts_at_zero() {
        let source = ReplayableSource::from("<p>one</p>");

        let mut first = source.scan();
        assert!(matches!(first.next(), Some(Token::StartTag(_))));
        assert_eq!(first.next(), Some(Token::Text("one".to_string())));

        let mut second = source.scan();
        assert!(matches!(second.next(), Some(Token::StartTag(tag)) if tag.name() == "p"));
    }

    #[test]
    fn test_clones_share_bytes() {
        let source = ReplayableSource::from(vec![b'a', b'b']);
        let copy = source.clone();
        assert_eq!(copy.as_bytes(), source.as_bytes());
        assert_eq!(copy.text(), "ab");
        assert_eq!(copy.len(), 2);
    }
}
