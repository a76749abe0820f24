//! Embedding client.
//!
//! Calls a llama.cpp / OpenAI-compatible `POST /v1/embeddings` endpoint and
//! returns the vectors together with the identity of the model that
//! produced them. The model identity drives collection naming, so a
//! response that carries vectors but no model is rejected.
//!
//! No retry is performed here: a failed call surfaces immediately and the
//! caller decides whether to retry the whole request.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::GatewayError;
use crate::models::EmbeddingResult;

const SERVICE: &str = "embedding service";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    model: String,
    data: Vec<EmbedDatum>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

/// Client for the remote embedding service.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections and
/// is shared by all in-flight requests.
#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(http: reqwest::Client, config: &EmbeddingConfig) -> Self {
        Self {
            http,
            endpoint: format!("{}/v1/embeddings", config.url.trim_end_matches('/')),
            timeout: config.timeout(),
        }
    }

    /// Embed `text` exactly as given.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::EmptyInput`] for empty or whitespace-only text, before any network call.
    /// - [`GatewayError::UpstreamUnavailable`] when the service cannot be reached or answers 5xx.
    /// - [`GatewayError::UpstreamProtocolError`] when the response cannot be decoded.
    /// - [`GatewayError::UpstreamEmptyResult`] when no vectors come back.
    #[tracing::instrument(name = "Embedding text", skip(self, text), fields(bytes = text.len()))]
    pub async fn embed(&self, text: &str) -> Result<EmbeddingResult, GatewayError> {
        if text.trim().is_empty() {
            return Err(GatewayError::EmptyInput);
        }

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&EmbedRequest { input: text })
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::from_reqwest(SERVICE, e))?;

        if !status.is_success() {
            return Err(GatewayError::from_status(SERVICE, status, &body));
        }

        let result = parse_embed_response(&body)?;
        tracing::debug!(
            model = %result.model,
            vectors = result.vectors.len(),
            "Received embeddings"
        );
        Ok(result)
    }
}

/// Decode an embeddings response body.
///
/// `data` order is taken as vector order.
fn parse_embed_response(body: &[u8]) -> Result<EmbeddingResult, GatewayError> {
    let parsed: EmbedResponse = serde_json::from_slice(body)
        .map_err(|e| GatewayError::protocol(SERVICE, format!("invalid embeddings response: {}", e)))?;

    if parsed.data.is_empty() {
        return Err(GatewayError::UpstreamEmptyResult);
    }
    if parsed.model.is_empty() {
        return Err(GatewayError::protocol(
            SERVICE,
            "embeddings response has vectors but no model",
        ));
    }

    Ok(EmbeddingResult {
        model: parsed.model,
        vectors: parsed.data.into_iter().map(|d| d.embedding).collect(),
    })
}
