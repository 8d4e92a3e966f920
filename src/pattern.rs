//! Advisory pattern validation.
//!
//! The list store persists any string; this check only exists so interactive
//! callers can catch typos before submitting.

use crate::error::{PanelError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Optional `*.` wildcard, dot-separated labels, 2+ letter final label; or a
/// `/regex/flags` literal.
static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?([a-zA-Z0-9-]+\.)*[a-zA-Z0-9-]+\.[a-zA-Z]{2,}$|^/.*/[gimuy]*$")
        .unwrap_or_else(|e| unreachable!("static pattern regex: {e}"))
});

/// Returns `true` if `pattern` looks like a domain, wildcard domain or
/// `/regex/`.
#[must_use]
pub fn is_valid(pattern: &str) -> bool {
    PATTERN.is_match(pattern)
}

/// Like [`is_valid`], but returns the pattern trimmed or an error.
///
/// # Errors
///
/// Returns [`PanelError::InvalidPattern`] if the trimmed pattern does not match.
pub fn validate(pattern: &str) -> Result<&str> {
    let trimmed = pattern.trim();
    if is_valid(trimmed) {
        Ok(trimmed)
    } else {
        Err(PanelError::InvalidPattern(pattern.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_domains_and_wildcards() {
        assert!(is_valid("example.com"));
        assert!(is_valid("ads.tracker.example.co"));
        assert!(is_valid("*.ads.example.com"));
        assert!(is_valid("my-host.io"));
    }

    #[test]
    fn accepts_regex_literals() {
        assert!(is_valid("/^ads?\\./"));
        assert!(is_valid("/doubleclick/i"));
        assert!(is_valid("//gimuy"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(!is_valid(""));
        assert!(!is_valid("localhost"));
        assert!(!is_valid("example.c"));
        assert!(!is_valid("example.123"));
        assert!(!is_valid("ads.*.example.com"));
        assert!(!is_valid("not a domain"));
        assert!(!is_valid("/unterminated"));
        assert!(!is_valid("/x/z"));
    }

    #[test]
    fn validate_trims() {
        assert_eq!(validate("  example.com \n").unwrap(), "example.com");
        assert!(matches!(validate("nope"), Err(PanelError::InvalidPattern(_))));
    }
}
