//! Process-wide panel configuration.

use crate::error::{PanelError, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of the backing list files (`<prefix>-allow.txt`, `<prefix>-deny.txt`).
pub const DEFAULT_FILE_PREFIX: &str = "blockinho";

/// Base URL of the blocking service when none is configured.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:4000";

/// Address the panel server binds when none is configured.
pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
    3000,
);

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by the server, the list store and the upstream client.
///
/// Built once at startup and passed down explicitly.
///
/// # Example
///
/// ```
/// use blockinho::PanelConfig;
///
/// let config = PanelConfig::new("/var/lib/blocky", "http://blocky:4000")
///     .with_file_prefix("panel");
///
/// assert_eq!(config.upstream_url, "http://blocky:4000");
/// assert_eq!(config.file_prefix, "panel");
/// ```
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Directory holding the two list files.
    pub config_dir: PathBuf,

    /// File name prefix for the list files.
    pub file_prefix: String,

    /// Base URL of the upstream blocking service (no trailing path).
    pub upstream_url: String,

    /// Address the HTTP server listens on.
    pub listen: SocketAddr,

    /// Timeout applied to every upstream request.
    pub request_timeout: Duration,
}

impl PanelConfig {
    /// Creates a config with the default prefix, listen address and timeout.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>, upstream_url: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            upstream_url: upstream_url.into(),
            listen: DEFAULT_LISTEN,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the list file prefix.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Overrides the listen address.
    #[must_use]
    pub const fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Overrides the upstream request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the backing directory.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Checks that the upstream URL is an absolute `http(s)` URL and the
    /// prefix is usable as part of a file name.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.upstream_url).map_err(|e| {
            PanelError::InvalidConfig(format!("upstream url {:?}: {e}", self.upstream_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PanelError::InvalidConfig(format!(
                "upstream url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(PanelError::InvalidConfig(format!(
                "bad file prefix {:?}",
                self.file_prefix
            )));
        }
        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::new(".", DEFAULT_UPSTREAM_URL)
    }
}
