//! Options read from `<select>` lists and the identifiers resolved from them.

use std::fmt;

/// Which list a selection was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Season,
    Team,
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKind::Season => write!(f, "season"),
            SelectionKind::Team => write!(f, "team"),
        }
    }
}

/// One `<option>`: the server's opaque identifier and its visible label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectableOption {
    pub value: String,
    pub label: String,
}

/// A selection the postback will submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub kind: SelectionKind,
    pub option: SelectableOption,
}

impl ResolvedSelection {
    pub fn new(kind: SelectionKind, option: SelectableOption) -> Self {
        Self { kind, option }
    }

    /// Identifier to post back.
    pub fn value(&self) -> &str {
        &self.option.value
    }

    pub fn label(&self) -> &str {
        &self.option.label
    }
}
