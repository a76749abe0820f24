//! Error taxonomy for the retrieval-augmented completion pipeline.
//!
//! Every pipeline stage returns [`GatewayError`]. Application-level code
//! (CLI, config loading, server bootstrap) wraps these in `anyhow` at the
//! edge; the HTTP layer maps them onto status codes via
//! [`GatewayError::code`] and [`GatewayError::http_status`].
//!
//! | Variant | Recoverable | Code |
//! |---------|-------------|------|
//! | [`EmptyQuery`](GatewayError::EmptyQuery) / [`EmptyInput`](GatewayError::EmptyInput) / [`InvalidTemperature`](GatewayError::InvalidTemperature) | caller error | `bad_request` |
//! | [`UpstreamUnavailable`](GatewayError::UpstreamUnavailable) | no | `upstream_unavailable` |
//! | [`UpstreamProtocolError`](GatewayError::UpstreamProtocolError) | no | `upstream_protocol_error` |
//! | [`UpstreamEmptyResult`](GatewayError::UpstreamEmptyResult) | no | `upstream_empty_result` |
//! | [`IndexUnavailable`](GatewayError::IndexUnavailable) | no | `index_unavailable` |
//! | [`CollectionNotFound`](GatewayError::CollectionNotFound) | yes, as "no grounding" | `collection_not_found` |
//! | [`StreamInterrupted`](GatewayError::StreamInterrupted) | partial output delivered | `stream_interrupted` |

use axum::http::StatusCode;

/// Errors produced by the gateway pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The user query was empty or whitespace-only.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The text to embed was empty or whitespace-only.
    #[error("input must not be empty")]
    EmptyInput,

    /// The requested sampling temperature is not a finite value in `[0, 2]`.
    #[error("temperature must be between 0 and 2, got {0}")]
    InvalidTemperature(f32),

    /// A remote service (embedding or generation) could not be reached.
    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    /// A remote service answered with something we could not decode.
    #[error("{service} protocol error: {message}")]
    UpstreamProtocolError {
        service: &'static str,
        message: String,
    },

    /// The embedding service returned zero vectors for non-empty input.
    #[error("embedding service returned no vectors")]
    UpstreamEmptyResult,

    /// The vector index could not be reached or failed the query.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// The requested collection does not exist in the vector index.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The generation stream ended abnormally after it was established.
    #[error("completion stream interrupted: {0}")]
    StreamInterrupted(String),

    /// The downstream consumer stopped accepting chunks.
    #[error("client disconnected")]
    ClientGone,
}

impl GatewayError {
    pub(crate) fn unavailable(service: &'static str, message: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service,
            message: message.to_string(),
        }
    }

    pub(crate) fn protocol(service: &'static str, message: impl ToString) -> Self {
        Self::UpstreamProtocolError {
            service,
            message: message.to_string(),
        }
    }

    /// Machine-readable error code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery | Self::EmptyInput | Self::InvalidTemperature(_) => "bad_request",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamProtocolError { .. } => "upstream_protocol_error",
            Self::UpstreamEmptyResult => "upstream_empty_result",
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::CollectionNotFound(_) => "collection_not_found",
            Self::StreamInterrupted(_) => "stream_interrupted",
            Self::ClientGone => "client_gone",
        }
    }

    /// HTTP status reported when this error reaches the request boundary
    /// before any streaming has begun.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::EmptyQuery | Self::EmptyInput | Self::InvalidTemperature(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamUnavailable { .. }
            | Self::UpstreamProtocolError { .. }
            | Self::UpstreamEmptyResult
            | Self::StreamInterrupted(_) => StatusCode::BAD_GATEWAY,
            Self::ClientGone => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    ///
    /// Server errors mean the service cannot serve us right now; anything
    /// else is a contract mismatch.
    pub(crate) fn from_status(
        service: &'static str,
        status: reqwest::StatusCode,
        body: &[u8],
    ) -> Self {
        let message = format!("HTTP {}: {}", status, String::from_utf8_lossy(body).trim());
        if status.is_server_error() {
            Self::unavailable(service, message)
        } else {
            Self::protocol(service, message)
        }
    }

    /// Maps a `reqwest` transport error onto the taxonomy.
    ///
    /// Connect failures and timeouts mean the service is unreachable;
    /// decode failures mean it answered with an unexpected shape.
    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::protocol(service, err)
        } else {
            Self::unavailable(service, err)
        }
    }
}
