//! Client for the upstream blocking service.
//!
//! The upstream exposes four endpoints the panel cares about:
//!
//! ```text
//! GET  /api/blocking/status
//! GET  /api/blocking/enable
//! GET  /api/blocking/disable[?duration=300s]
//! POST /api/lists/refresh
//! ```
//!
//! [`BlockyClient`] offers them twice: as raw [`Forwarded`] responses for the
//! proxying server, and through the typed [`BlockingControl`] trait that the
//! [`Reconciler`](crate::Reconciler) drives.

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Upstream view of blocking state, as returned by `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingStatus {
    /// Whether blocking is currently on.
    pub enabled: bool,

    /// Seconds until blocking re-enables itself, if a timed pause is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_enable_in_sec: Option<u64>,

    /// Groups the upstream currently has disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_groups: Option<Vec<String>>,
}

/// Operations that change or report upstream blocking state.
///
/// Implemented by [`BlockyClient`] (talks to the blocking service directly) and
/// by [`PanelClient`](crate::PanelClient) (talks through the panel server).
#[async_trait]
pub trait BlockingControl: Send + Sync {
    /// Fetches the current status.
    async fn status(&self) -> Result<BlockingStatus>;

    /// Resumes blocking.
    async fn enable(&self) -> Result<()>;

    /// Pauses blocking, indefinitely when `duration` is `None`.
    ///
    /// `duration` is passed through verbatim (`"300s"`, `"1800s"`, ...).
    async fn disable(&self, duration: Option<&str>) -> Result<()>;

    /// Asks the upstream to reload its list sources.
    async fn refresh(&self) -> Result<()>;
}

/// An upstream response captured verbatim for proxying.
#[derive(Debug, Clone)]
pub struct Forwarded {
    /// Upstream HTTP status code.
    pub status: u16,
    /// Upstream `Content-Type`, if it sent one.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: Bytes,
}

impl Forwarded {
    /// Returns `true` for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Converts a non-2xx response into [`PanelError::UpstreamStatus`].
    ///
    /// # Errors
    ///
    /// Returns the error for any status outside 200..300.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(PanelError::UpstreamStatus {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }
}

/// HTTP client for the blocking service.
#[derive(Debug, Clone)]
pub struct BlockyClient {
    base: String,
    http: reqwest::Client,
}

impl BlockyClient {
    /// Creates a client for the configured upstream.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Unreachable`] if the HTTP client cannot be built.
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("blockinho/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(&config.upstream_url, http))
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(base: &str, http: reqwest::Client) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Returns the upstream base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `GET /api/blocking/status`.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Unreachable`] if no response arrives.
    pub async fn forward_status(&self) -> Result<Forwarded> {
        self.send(Method::GET, "/api/blocking/status", None).await
    }

    /// `GET /api/blocking/enable`.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Unreachable`] if no response arrives.
    pub async fn forward_enable(&self) -> Result<Forwarded> {
        self.send(Method::GET, "/api/blocking/enable", None).await
    }

    /// `GET /api/blocking/disable`, with `?duration=` when one is given.
    ///
    /// An empty duration is treated as no duration.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Unreachable`] if no response arrives.
    pub async fn forward_disable(&self, duration: Option<&str>) -> Result<Forwarded> {
        let duration = duration.filter(|d| !d.is_empty());
        self.send(Method::GET, "/api/blocking/disable", duration).await
    }

    /// `POST /api/lists/refresh`.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Unreachable`] if no response arrives.
    pub async fn forward_refresh(&self) -> Result<Forwarded> {
        self.send(Method::POST, "/api/lists/refresh", None).await
    }

    async fn send(&self, method: Method, path: &str, duration: Option<&str>) -> Result<Forwarded> {
        let url = format!("{}{path}", self.base);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(duration) = duration {
            request = request.query(&[("duration", duration)]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, url = %url, error = %e, "Upstream request failed");
            PanelError::Unreachable(e)
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        if (200..300).contains(&status) {
            tracing::debug!(method = %method, url = %url, status, "Upstream responded");
        } else {
            tracing::warn!(method = %method, url = %url, status, "Upstream returned error status");
        }

        Ok(Forwarded {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl BlockingControl for BlockyClient {
    async fn status(&self) -> Result<BlockingStatus> {
        let response = self.forward_status().await?.error_for_status()?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    async fn enable(&self) -> Result<()> {
        self.forward_enable().await?.error_for_status()?;
        Ok(())
    }

    async fn disable(&self, duration: Option<&str>) -> Result<()> {
        self.forward_disable(duration).await?.error_for_status()?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.forward_refresh().await?.error_for_status()?;
        Ok(())
    }
}
