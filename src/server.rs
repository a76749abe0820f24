//! Inbound HTTP server.
//!
//! Exposes the pipeline as a small JSON/SSE API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/embed` | Embed `{"input"}`, return the vectors |
//! | `POST` | `/api/completion` | Grounded completion for `{"prompt", "temperature"?}`, streamed as `text/event-stream` |
//! | `POST` | `/api/search` | Retrieval only: the passages that would ground `{"query"}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Failures before any output has been streamed are reported as:
//!
//! ```json
//! { "result": { "status": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Once a completion stream has started, the status line is already sent;
//! an upstream interruption ends the response body early and is logged.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::GatewayError;
use crate::models::Namespace;
use crate::pipeline::{RagPipeline, RetrievalParams};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RagPipeline>,
    default_temperature: f32,
}

impl AppState {
    pub fn new(pipeline: RagPipeline, default_temperature: f32) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            default_temperature,
        }
    }
}

/// Build the router. Split from [`run_server`] so tests can serve it on
/// an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/embed", post(handle_embed))
        .route("/api/completion", post(handle_completion))
        .route("/api/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = RagPipeline::from_config(config)?;
    let state = AppState::new(pipeline, config.generation.temperature);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "gorag listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Result envelope ============

/// `{"status", "message"}` pair carried by every JSON response.
#[derive(Serialize)]
struct ResultStatus {
    status: String,
    message: String,
}

impl ResultStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: String::new(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    result: ResultStatus,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError(GatewayError);

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.http_status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::info!(error = %self.0, "Request rejected");
        }
        let body = ErrorBody {
            result: ResultStatus {
                status: self.0.code().to_string(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/embed ============

#[derive(Deserialize)]
struct EmbedRequest {
    input: String,
}

#[derive(Serialize)]
struct EmbedResponse {
    result: ResultStatus,
    embeddings: Vec<Vec<f32>>,
}

async fn handle_embed(
    State(state): State<AppState>,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, AppError> {
    let embedded = state.pipeline.embedder().embed(&req.input).await?;
    Ok(Json(EmbedResponse {
        result: ResultStatus::ok(),
        embeddings: embedded.vectors,
    }))
}

// ============ POST /api/search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    min_score: Option<f32>,
}

#[derive(Serialize)]
struct SearchResponse {
    result: ResultStatus,
    namespace: Namespace,
    context: Vec<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let defaults = state.pipeline.retrieval_params();
    let params = RetrievalParams {
        limit: req.limit.unwrap_or(defaults.limit),
        min_score: req.min_score.unwrap_or(defaults.min_score),
    };

    let grounding = state.pipeline.retrieve(&req.query, params).await?;
    Ok(Json(SearchResponse {
        result: ResultStatus::ok(),
        namespace: grounding.namespace,
        context: grounding.context,
    }))
}

// ============ POST /api/completion ============

#[derive(Deserialize)]
struct CompletionRequest {
    prompt: String,
    #[serde(default)]
    temperature: Option<f32>,
}

/// Handler for `POST /api/completion`.
///
/// Retrieval, prompt assembly and opening the upstream stream all happen
/// before the response starts, so their failures get a JSON error body.
/// After that each upstream chunk becomes one body frame. If the client
/// goes away, axum drops the body, which drops the upstream stream.
async fn handle_completion(
    State(state): State<AppState>,
    Json(req): Json<CompletionRequest>,
) -> Result<Response, AppError> {
    let temperature = req.temperature.unwrap_or(state.default_temperature);
    let stream = state.pipeline.answer(&req.prompt, temperature).await?;

    let body = stream.into_stream().filter_map(|item| async move {
        match item {
            Ok(chunk) => Some(Ok::<_, Infallible>(chunk.into_bytes())),
            Err(e) => {
                tracing::warn!(error = %e, "Completion stream ended early");
                None
            }
        }
    });

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
