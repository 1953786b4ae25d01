//! Key selection and name filtering for read and presence operations.

use regex::Regex;

use crate::error::{KvError, Result};

// == Key Selection ==
/// Which keys an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    /// Every key currently in the primary hash
    All,
    /// A single named key
    One(String),
}

impl KeySelection {
    /// Builds a selection from an optional path segment.
    pub fn from_path(id: Option<String>) -> Self {
        match id {
            Some(key) => KeySelection::One(key),
            None => KeySelection::All,
        }
    }
}

// == Key Filter ==
/// Regex filter applied to candidate key names.
///
/// A key matches when the pattern matches at the start of the name; the
/// rest of the name is unconstrained, so `bat*` accepts `batman`.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    regex: Regex,
}

impl KeyFilter {
    // == Parse ==
    /// Compiles `pattern`, failing with [`KvError::InvalidFilter`].
    pub fn parse(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|e| KvError::InvalidFilter(e.to_string()))
    }

    // == Matches ==
    /// Returns true if the pattern matches at the start of `key`.
    pub fn matches(&self, key: &str) -> bool {
        // Leftmost-first search: a match at 0 is returned whenever one exists.
        self.regex.find(key).is_some_and(|m| m.start() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_anchored_match() {
        let filter = KeyFilter::parse("bat*").unwrap();
        assert!(filter.matches("batman"));
        assert!(filter.matches("ba"));
        assert!(!filter.matches("joker"));
        assert!(!filter.matches("acrobat"));
    }

    #[test]
    fn test_match_not_required_to_cover_whole_key() {
        let filter = KeyFilter::parse("a.c").unwrap();
        assert!(filter.matches("abcdef"));
        assert!(!filter.matches("xabc"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(matches!(KeyFilter::parse("*"), Err(KvError::InvalidFilter(_))));
        assert!(matches!(KeyFilter::parse("(abc"), Err(KvError::InvalidFilter(_))));
    }

    #[test]
    fn test_selection_from_path() {
        assert_eq!(KeySelection::from_path(None), KeySelection::All);
        assert_eq!(
            KeySelection::from_path(Some("k".to_string())),
            KeySelection::One("k".to_string())
        );
    }
}
