//! Overlay HTTP server
//!
//! Serves the bubble UI, exposes the current overlay state, and ingests
//! gamestate events. Ingestion and pipeline execution are independent
//! writers; they only meet at the overlay store's critical section, so a
//! `/gamestate` POST is accepted even while a voice turn is in flight.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::OverlayStore;
use crate::config::OverlayConfig;
use crate::gamestate::GamestateLog;
use crate::{Error, Result};

/// Bubble UI served when no static directory is configured
const EMBEDDED_PAGE: &str = include_str!("../../assets/overlay.html");

/// Shared state for the overlay handlers
#[derive(Clone)]
struct OverlayApi {
    store: OverlayStore,
    log: GamestateLog,
}

/// The overlay HTTP server
pub struct OverlayServer {
    store: OverlayStore,
    log: GamestateLog,
    config: OverlayConfig,
}

impl OverlayServer {
    /// Create a server over the given stores
    #[must_use]
    pub fn new(store: OverlayStore, log: GamestateLog, config: OverlayConfig) -> Self {
        Self { store, log, config }
    }

    /// Bind the listener and serve in a background task
    ///
    /// Binding happens before this returns, so a busy port fails startup
    /// immediately instead of surfacing later from inside the task.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the address cannot be bound.
    pub async fn spawn(self) -> Result<tokio::task::JoinHandle<Result<()>>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind overlay server on {addr}: {e}")))?;

        tracing::info!(addr = %addr, "overlay server listening");

        let router = router(self.store, self.log, self.config.static_dir.as_deref());
        Ok(tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .map_err(|e| Error::Config(format!("overlay server error: {e}")))
        }))
    }
}

/// Build the overlay router (exposed for tests)
#[must_use]
pub fn router(store: OverlayStore, log: GamestateLog, static_dir: Option<&std::path::Path>) -> Router {
    let state = Arc::new(OverlayApi { store, log });

    let mut router = Router::new()
        .route("/state", get(get_state))
        .route("/gamestate", post(post_gamestate))
        .with_state(state);

    // Static UI: a configured directory wins over the embedded page
    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
        tracing::info!(path = %dir.display(), "serving overlay assets from disk");
    } else {
        router = router.route("/", get(index));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// Serve the embedded overlay page
async fn index() -> Html<&'static str> {
    Html(EMBEDDED_PAGE)
}

/// Read the current overlay state
async fn get_state(State(api): State<Arc<OverlayApi>>) -> Json<super::OverlayState> {
    Json(api.store.snapshot())
}

/// Ingest one gamestate event
///
/// Body is arbitrary JSON. 202 on append; 400 when the body is not a JSON
/// object, in which case the log is unchanged.
async fn post_gamestate(
    State(api): State<Arc<OverlayApi>>,
    body: String,
) -> (StatusCode, Json<Value>) {
    let raw: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed gamestate payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("malformed JSON: {e}")})),
            );
        }
    };

    match api.log.append(raw) {
        Ok(event) => {
            tracing::debug!(
                event_id = event.event_id.as_deref().unwrap_or("-"),
                "gamestate event appended"
            );
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({"status": "accepted"})),
            )
        }
        Err(Error::Ingest(reason)) => {
            tracing::warn!(reason = %reason, "rejecting gamestate payload");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": reason})),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to append gamestate event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to persist event"})),
            )
        }
    }
}
