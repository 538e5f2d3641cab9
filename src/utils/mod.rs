//! Utility functions and helpers.

pub mod http;

/// Collapse runs of whitespace (including non-breaking spaces) to single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Monday,\n\t January 2 "), "Monday, January 2");
        assert_eq!(normalize_whitespace("Megpies\u{a0}FC"), "Megpies FC");
        assert_eq!(normalize_whitespace(" \n "), "");
    }
}
