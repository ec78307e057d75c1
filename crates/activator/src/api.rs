//! HTTP surface: `POST /activate` and the diagnostic log endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dial::ErrorCode;
use dial_pppd::SessionLogs;
use serde::Serialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::activate::{ActivateResponse, Activator};

#[derive(Clone)]
pub struct AppState {
    pub activator: Arc<Activator>,
    pub logs: SessionLogs,
}

#[derive(Debug, Serialize)]
struct DialLog {
    success: bool,
    log_file: String,
    log_content: String,
}

#[derive(Debug, Serialize)]
struct DialLogError {
    success: bool,
    error: String,
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    Router::new()
        .route("/activate", post(activate))
        .route("/dial-logs", get(dial_logs))
        .route("/api/dial-logs", get(dial_logs))
        .with_state(state)
        .layer(middleware)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn activate(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    // An unparsable body is validated like an empty one: every field missing.
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            debug!(%rejection, "request body is not JSON");
            Value::Null
        }
    };

    // Detached so a client disconnect cannot cancel a dial mid-session.
    let activator = Arc::clone(&state.activator);
    match tokio::spawn(async move { activator.activate(&body).await }).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            error!(error = %e, "activation task failed");
            let resp = ActivateResponse {
                success: false,
                username: None,
                iface: None,
                mac: None,
                ip: None,
                error_code: Some(ErrorCode::StartFailed),
                error_message: Some("internal error".to_string()),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(resp)).into_response()
        }
    }
}

async fn dial_logs(State(state): State<AppState>) -> Response {
    let latest = match state.logs.latest().await {
        Ok(Some(path)) => path,
        Ok(None) => return log_error(StatusCode::NOT_FOUND, "no dial logs found"),
        Err(e) => {
            warn!(dir = %state.logs.dir().display(), error = %e, "list dial logs failed");
            return log_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list dial logs");
        }
    };

    match tokio::fs::read(&latest).await {
        Ok(bytes) => {
            let log_file = latest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Json(DialLog {
                success: true,
                log_file,
                log_content: String::from_utf8_lossy(&bytes).into_owned(),
            })
            .into_response()
        }
        Err(e) => {
            warn!(path = %latest.display(), error = %e, "read dial log failed");
            log_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to read dial log")
        }
    }
}

fn log_error(status: StatusCode, message: &str) -> Response {
    let body = DialLogError {
        success: false,
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}
