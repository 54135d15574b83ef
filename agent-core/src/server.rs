//! HTTP surface: invocation, health and metrics routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::agent::{AgentService, InvocationRequest, InvocationResponse};
use crate::error::{AgentError, Result};
use crate::security::ValidationError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
}

/// `AgentError` rendered as a JSON error body.
pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AgentError::InvalidInput(ValidationError::InvalidFormat(
            rejection.body_text(),
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(target: "server", error = %self.0, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", post(invocations))
        .route("/invocations", post(invocations))
        .route("/ping", get(ping))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn invocations(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InvocationRequest>, JsonRejection>,
) -> std::result::Result<Json<InvocationResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.invoke(request).await?;
    Ok(Json(response))
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn metrics(State(state): State<AppState>) -> std::result::Result<Response, ApiError> {
    let body = state.service.metrics().export()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(target: "server::startup", addr = %addr, "Server is ready and listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: "server::shutdown", "Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "server::shutdown", error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(target: "server::shutdown", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(target: "server::shutdown", "Shutdown signal received");
}
