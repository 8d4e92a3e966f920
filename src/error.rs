//! Error types.

use thiserror::Error;

/// Result alias for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors returned by panel operations.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Reading or writing a backing list file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upstream could not be reached (connection refused, timeout, ...).
    #[error("upstream unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The upstream answered with a non-2xx status.
    #[error("upstream returned {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// A response body was not the JSON we expected.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A pattern failed the advisory domain/regex check.
    #[error("not a domain, wildcard or /regex/: {0}")]
    InvalidPattern(String),

    /// A list name other than `allow` or `deny`.
    #[error("unknown list kind {0:?} (expected allow or deny)")]
    UnknownListKind(String),

    /// Invalid configuration values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl PanelError {
    /// Returns `true` if the underlying I/O error is `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Returns `true` if the upstream never produced a response.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_is_detected() {
        let err = PanelError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert!(!err.is_unreachable());
    }

    #[test]
    fn upstream_status_display() {
        let err = PanelError::UpstreamStatus {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned 503: down");
    }
}
