//! Client for the panel's own HTTP API.
//!
//! This is the presentation side: it reads and writes the lists through
//! `/api/list` and drives blocking through `/api/status`, `/api/enable`,
//! `/api/disable` and `/api/refresh`.

use crate::error::{PanelError, Result};
use crate::list_store::{ListKind, Lists};
use crate::upstream::{BlockingControl, BlockingStatus};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct DisableBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<&'a str>,
}

/// HTTP client for a running panel server.
#[derive(Debug, Clone)]
pub struct PanelClient {
    base: String,
    http: reqwest::Client,
}

impl PanelClient {
    /// Creates a client for the panel at `base` (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Unreachable`] if the HTTP client cannot be built.
    pub fn new(base: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// `GET /api/list`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is malformed.
    pub async fn lists(&self) -> Result<Lists> {
        let response = send(self.http.get(self.url("/api/list"))).await?;
        decode(response).await
    }

    /// `PUT /api/list`, replacing both lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn replace_lists(&self, lists: &Lists) -> Result<()> {
        let response = send(self.http.put(self.url("/api/list")).json(lists)).await?;
        check(response).await?;
        Ok(())
    }

    /// Reads both lists, appends `pattern` to `kind` if absent, and writes
    /// both back. Returns the lists as the server reports them afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three requests fails.
    pub async fn add_pattern(&self, kind: ListKind, pattern: &str) -> Result<Lists> {
        let mut lists = self.lists().await?;
        if !lists.insert(kind, pattern) {
            tracing::debug!(kind = %kind, pattern = %pattern, "Pattern already present");
        }
        self.replace_lists(&lists).await?;
        self.lists().await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let response = send(self.http.post(self.url(path)).json(body)).await?;
        check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl BlockingControl for PanelClient {
    async fn status(&self) -> Result<BlockingStatus> {
        let response = send(self.http.get(self.url("/api/status"))).await?;
        decode(response).await
    }

    async fn enable(&self) -> Result<()> {
        self.post("/api/enable", &serde_json::json!({})).await
    }

    async fn disable(&self, duration: Option<&str>) -> Result<()> {
        self.post("/api/disable", &DisableBody { duration }).await
    }

    async fn refresh(&self) -> Result<()> {
        self.post("/api/refresh", &serde_json::json!({})).await
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    request.send().await.map_err(|e| {
        tracing::warn!(url = ?e.url().map(reqwest::Url::as_str), error = %e, "Panel unreachable");
        PanelError::Unreachable(e)
    })
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(url = %url, status = status.as_u16(), body = %body, "Panel request failed");
    Err(PanelError::UpstreamStatus {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = check(response).await?.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn disable_body_omits_missing_duration() {
        let body = serde_json::to_string(&DisableBody { duration: None }).unwrap();
        assert_eq!(body, "{}");
        let body = serde_json::to_string(&DisableBody {
            duration: Some("300s"),
        })
        .unwrap();
        assert_eq!(body, r#"{"duration":"300s"}"#);
    }

    #[test]
    fn base_trailing_slash_trimmed() {
        let client = PanelClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/api/list"), "http://localhost:3000/api/list");
    }

    #[tokio::test]
    async fn failed_mutations_are_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = Router::new().route(
            "/api/refresh",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = PanelClient::new(&format!("http://{addr}")).unwrap();
        let err = client.refresh().await.unwrap_err();
        assert!(matches!(err, PanelError::UpstreamStatus { status: 503, .. }));
        assert!(logs.text().contains("Panel request failed"));

        let dead = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = PanelClient::new(&format!("http://{dead}")).unwrap();
        assert!(client.enable().await.unwrap_err().is_unreachable());
        assert!(logs.text().contains("Panel unreachable"));
    }
}
