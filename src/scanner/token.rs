// src/scanner/token.rs

//! Token types produced by the [`Scanner`](super::Scanner).

use std::io;

use thiserror::Error;

/// A single `key="value"` pair on a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, ASCII-lowercased
    pub key: String,

    /// Attribute value with character references decoded
    pub value: String,
}

/// Forward-only cursor over a tag's attributes.
///
/// The cursor is owned by its token: dropping it abandons whatever was not
/// read, and it can never be confused with the attributes of a later tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    items: Vec<Attribute>,
    cursor: usize,
}

impl Attributes {
    pub(crate) fn new(items: Vec<Attribute>) -> Self {
        Self { items, cursor: 0 }
    }

    /// Whether attributes remain to be read.
    pub fn has_more(&self) -> bool {
        self.cursor < self.items.len()
    }

    /// Read the next attribute as a `(key, value, has_more)` triple.
    pub fn next_attr(&mut self) -> Option<(&str, &str, bool)> {
        let item = self.items.get(self.cursor)?;
        self.cursor += 1;
        let has_more = self.cursor < self.items.len();
        Some((item.key.as_str(), item.value.as_str(), has_more))
    }
}

impl Iterator for Attributes {
    type Item = Attribute;

    fn next(&mut self) -> Option<Attribute> {
        let item = self.items.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(item)
    }
}

/// A start or self-closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    attrs: Attributes,
}

impl Tag {
    pub(crate) fn new(name: String, attrs: Vec<Attribute>) -> Self {
        Self {
            name,
            attrs: Attributes::new(attrs),
        }
    }

    /// Tag name, ASCII-lowercased.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_attributes(&self) -> bool {
        !self.attrs.items.is_empty()
    }

    /// Value of the first attribute named `key`, regardless of cursor position.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .items
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Whether an attribute named `key` is present (valueless or not).
    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.items.iter().any(|a| a.key == key)
    }

    /// Borrow the attribute cursor.
    pub fn attributes(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// Take the attribute cursor, consuming the tag.
    pub fn into_attributes(self) -> Attributes {
        self.attrs
    }
}

/// Why a scan ended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Input ended between tokens
    #[error("end of stream")]
    EndOfStream,

    /// Input ended or broke inside a tag
    #[error("malformed markup: {0}")]
    Malformed(String),

    /// The underlying reader failed
    #[error("read failed: {0}")]
    Io(String),
}

impl ScanError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// One lexical unit of an HTML stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name ...>`
    StartTag(Tag),
    /// `</name>`
    EndTag(String),
    /// `<name ... />`
    SelfClosingTag(Tag),
    /// Character data between tags
    Text(String),
    /// Terminal token; nothing follows it
    Error(ScanError),
}

impl Token {
    /// Name of the tag for start, end and self-closing tokens.
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Token::StartTag(tag) | Token::SelfClosingTag(tag) => Some(tag.name()),
            Token::EndTag(name) => Some(name),
            Token::Text(_) | Token::Error(_) => None,
        }
    }

    pub fn is_end_tag(&self, name: &str) -> bool {
        matches!(self, Token::EndTag(n) if n == name)
    }
}
