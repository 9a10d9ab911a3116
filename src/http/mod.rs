//! HTTP layer: one axum router per service.
//!
//! Every router shares the same envelope:
//! - `POST` body parsed leniently as JSON, validated by the domain layer
//! - 400 `{"error": <message>}` for contract violations
//! - 500 `{"error": "Internal server error"}` for anything else, including
//!   panics inside a handler (detail goes to the log only)
//! - `GET /health` reporting the loaded model's fingerprint

pub mod event;
pub mod next_relapse;
pub mod relapse;

use std::any::Any;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::domain::{ModelError, ValidationError};

const INTERNAL_ERROR: &str = "Internal server error";

/// Error returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client sent a payload violating the feature contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Inference failed after validation passed.
    #[error("{0}")]
    Internal(String),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(err) => {
                tracing::warn!("Rejected request: {}", err);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
            }
            Self::Internal(detail) => {
                tracing::error!("Prediction failed: {}", detail);
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_ERROR })),
    )
        .into_response()
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("<non-string panic payload>");
    tracing::error!("Handler panicked: {}", detail);
    internal_error()
}

/// Parse a request body as JSON.
///
/// Content type is not checked; anything that does not parse is reported
/// the same way as a non-object body.
fn parse_body(body: &Bytes) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|_| ValidationError::NotAnObject)
}

#[derive(Debug, Clone, Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    model_fingerprint: String,
}

async fn health(State(health): State<Arc<Health>>) -> Json<Health> {
    Json(health.as_ref().clone())
}

fn health_router(service: &'static str, fingerprint: &str) -> Router {
    let state = Arc::new(Health {
        status: "ok",
        service,
        model_fingerprint: fingerprint.to_string(),
    });
    Router::new().route("/health", get(health)).with_state(state)
}

/// Wrap a service router in the shared middleware stack.
fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured address and serve `router` until Ctrl-C or SIGTERM.
///
/// In-flight requests are drained before returning.
///
/// # Errors
/// Returns error if the address cannot be bound or the server fails.
pub async fn serve(router: Router, config: &ServiceConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    tracing::info!(
        "{} listening on http://{}",
        config.kind.name(),
        listener.local_addr()?
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("{} shutdown complete.", config.kind.name());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining in-flight requests");
}
