//! HTTP surface of the panel.
//!
//! | Method | Path           | Handled by                          |
//! |--------|----------------|-------------------------------------|
//! | GET    | `/api/list`    | [`ListStore::get_lists`]            |
//! | PUT    | `/api/list`    | [`ListStore::replace_lists`]        |
//! | GET    | `/api/status`  | upstream, response forwarded as-is  |
//! | POST   | `/api/disable` | upstream, response forwarded as-is  |
//! | POST   | `/api/enable`  | upstream, response forwarded as-is  |
//! | POST   | `/api/refresh` | upstream, response forwarded as-is  |

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::list_store::{ListStore, Lists};
use crate::upstream::{BlockyClient, Forwarded};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// State shared by all handlers.
pub struct AppState {
    pub store: ListStore,
    pub upstream: BlockyClient,
}

impl AppState {
    /// Builds the store and upstream client from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: &PanelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: ListStore::from_config(config),
            upstream: BlockyClient::new(config)?,
        })
    }
}

/// Builds the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/list", get(get_lists).put(put_lists))
        .route("/api/status", get(get_status))
        .route("/api/disable", post(post_disable))
        .route("/api/enable", post(post_enable))
        .route("/api/refresh", post(post_refresh))
        .with_state(state)
}

/// Binds `config.listen` and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the config is invalid or the listener fails.
pub async fn serve(config: &PanelConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await?;
    serve_on(listener, config, shutdown_signal()).await
}

/// Serves on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the config is invalid or the server fails.
pub async fn serve_on<F>(listener: TcpListener, config: &PanelConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState::new(config)?);
    let addr = listener.local_addr()?;
    tracing::info!(
        addr = %addr,
        upstream = %state.upstream.base_url(),
        dir = %state.store.dir().display(),
        "Panel listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Panel stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Success {
    success: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DisableRequest {
    #[serde(default)]
    duration: Option<String>,
}

async fn get_lists(State(state): State<Arc<AppState>>) -> std::result::Result<Json<Lists>, ApiError> {
    Ok(Json(state.store.get_lists()?))
}

async fn put_lists(
    State(state): State<Arc<AppState>>,
    Json(lists): Json<Lists>,
) -> std::result::Result<Json<Success>, ApiError> {
    state.store.replace_lists(&lists)?;
    Ok(Json(Success { success: true }))
}

async fn get_status(State(state): State<Arc<AppState>>) -> std::result::Result<Forwarded, ApiError> {
    Ok(state.upstream.forward_status().await?)
}

async fn post_disable(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Forwarded, ApiError> {
    let request: DisableRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DisableRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    Ok(state
        .upstream
        .forward_disable(request.duration.as_deref())
        .await?)
}

async fn post_enable(State(state): State<Arc<AppState>>) -> std::result::Result<Forwarded, ApiError> {
    Ok(state.upstream.forward_enable().await?)
}

async fn post_refresh(State(state): State<Arc<AppState>>) -> std::result::Result<Forwarded, ApiError> {
    Ok(state.upstream.forward_refresh().await?)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = (status, self.body).into_response();
        if let Some(value) = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
        {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

/// Handler error, rendered as `{"error": "..."}`.
struct ApiError(PanelError);

impl<E: Into<PanelError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PanelError::Unreachable(_) | PanelError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            PanelError::Decode(_)
            | PanelError::InvalidPattern(_)
            | PanelError::UnknownListKind(_) => StatusCode::BAD_REQUEST,
            PanelError::Io(_) | PanelError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = status.as_u16(), error = %self.0, "Request failed");
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
