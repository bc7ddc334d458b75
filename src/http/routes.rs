use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::emotion::Emotion;
use crate::error::{log_inference_error, ErrorCode, InferenceError, StartupError};
use crate::inference::{Deadline, InferenceService};
use crate::store::PredictionRecord;

/// Multipart field carrying the clip
pub const AUDIO_FIELD: &str = "audio";

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    service: InferenceService,
    started: Instant,
    request_timeout: Duration,
    max_upload_bytes: usize,
    allow_cors: bool,
}

impl AppState {
    pub fn new(service: InferenceService, config: &ServerConfig) -> Self {
        Self {
            service,
            started: Instant::now(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_upload_bytes: config.max_upload_bytes,
            allow_cors: config.allow_cors,
        }
    }
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    BadRequest(String),
    PayloadTooLarge,
    Unprocessable { code: i32, message: String },
    ServiceUnavailable { code: i32, message: String },
    Timeout,
    Internal { code: Option<i32>, message: String },
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                None,
                "upload exceeds the size limit".to_string(),
            ),
            Self::Unprocessable { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, Some(code), message)
            }
            Self::ServiceUnavailable { code, message } => {
                (StatusCode::SERVICE_UNAVAILABLE, Some(code), message)
            }
            Self::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                None,
                "prediction timed out".to_string(),
            ),
            Self::Internal { code, message } => (StatusCode::INTERNAL_SERVER_ERROR, code, message),
        };

        let body = match code {
            Some(code) => serde_json::json!({ "error": message, "code": code }),
            None => serde_json::json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<InferenceError> for HttpServerError {
    fn from(err: InferenceError) -> Self {
        let code = err.code();
        let message = err.message();
        match err {
            InferenceError::UnprocessableInput { .. } => Self::Unprocessable { code, message },
            InferenceError::Persistence(_) => Self::ServiceUnavailable { code, message },
            InferenceError::Io { .. } | InferenceError::Internal { .. } => Self::Internal {
                code: Some(code),
                message,
            },
            InferenceError::Cancelled => Self::Timeout,
        }
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_ms: u64,
    pub classes: Vec<Emotion>,
    pub trees: usize,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let allow_cors = state.allow_cors;

    let router = Router::new()
        .route("/predict", post(predict))
        .route("/emotions", get(emotions))
        .route("/health", get(health))
        .layer(body_limit)
        .with_state(state);

    if allow_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Run the HTTP server loop until Ctrl-C.
pub async fn run_http_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| StartupError::Bind {
            addr: addr.to_string(),
            reason: err.to_string(),
        })?;
    tracing::info!("[HTTP] Listening on {}", addr);

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving prediction HTTP router")?;
    tracing::info!("[HTTP] Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("[HTTP] Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("[HTTP] Shutdown requested");
}

pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionRecord>, HttpServerError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(map_multipart_error)?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(HttpServerError::BadRequest("No audio file provided".to_string()));
    };

    let service = state.service.clone();
    let deadline = Deadline::new();
    let task_deadline = deadline.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        service.predict_upload_before(file_name.as_deref(), &bytes, &task_deadline)
    });

    let joined = match tokio::time::timeout(state.request_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) if deadline.expire() => {
            tracing::warn!(
                "[HTTP] POST /predict exceeded {} ms",
                state.request_timeout.as_millis()
            );
            return Err(HttpServerError::Timeout);
        }
        // Already writing the log entry; answer with what was recorded
        Err(_) => task.await,
    };

    let emotion = match joined {
        Err(join_err) => {
            return Err(HttpServerError::Internal {
                code: None,
                message: format!("prediction task failed: {}", join_err),
            })
        }
        Ok(result) => result.map_err(|err| {
            log_inference_error(&err, "POST /predict");
            HttpServerError::from(err)
        })?,
    };

    Ok(Json(PredictionRecord { emotion }))
}

pub async fn emotions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PredictionRecord>>, HttpServerError> {
    let service = state.service.clone();
    let records = tokio::task::spawn_blocking(move || service.history())
        .await
        .map_err(|join_err| HttpServerError::Internal {
            code: None,
            message: format!("history task failed: {}", join_err),
        })?
        .map_err(|err| {
            log_inference_error(&err, "GET /emotions");
            HttpServerError::from(err)
        })?;

    Ok(Json(records))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.service.model();
    Json(HealthResponse {
        status: "ok",
        uptime_ms: state.started.elapsed().as_millis() as u64,
        classes: model.classes().to_vec(),
        trees: model.n_trees(),
    })
}

fn map_multipart_error(err: axum::extract::multipart::MultipartError) -> HttpServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HttpServerError::PayloadTooLarge
    } else {
        HttpServerError::BadRequest(err.body_text())
    }
}
