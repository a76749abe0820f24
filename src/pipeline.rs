//! The retrieval-augmented completion pipeline.
//!
//! [`RagPipeline`] owns one handle per collaborator and runs the stages of
//! a request in order:
//!
//! ```text
//! query ─▶ embed ─▶ name collection ─▶ search ─▶ filter ─▶ assemble ─▶ stream
//! ```
//!
//! Handles are built once at startup ([`RagPipeline::from_config`]) or
//! injected ([`RagPipeline::new`]) and shared read-only by every request.
//! A missing collection is not an error here: it simply means no
//! grounding is available for the model in use.

use std::sync::Arc;

use crate::collection::collection_name_for;
use crate::completion::{CompletionClient, CompletionStream};
use crate::config::{Config, RetrievalConfig};
use crate::embedding::EmbeddingClient;
use crate::error::GatewayError;
use crate::index::{QdrantIndex, RetrievalClient, VectorIndex};
use crate::models::{CompletionChunk, Namespace, PromptMessage};
use crate::prompt::assemble_prompt;
use crate::relevance::filter_relevant;

/// Retrieval knobs for a single request.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub limit: usize,
    pub min_score: f32,
}

impl From<&RetrievalConfig> for RetrievalParams {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            limit: config.limit,
            min_score: config.min_score,
        }
    }
}

/// Passages retrieved for one query, with the collection they came from.
#[derive(Debug, Clone)]
pub struct Grounding {
    pub namespace: Namespace,
    pub context: Vec<String>,
}

/// The assembled end-to-end pipeline.
#[derive(Clone)]
pub struct RagPipeline {
    embedder: EmbeddingClient,
    retriever: RetrievalClient,
    completions: CompletionClient,
    retrieval: RetrievalParams,
}

impl RagPipeline {
    pub fn new(
        embedder: EmbeddingClient,
        retriever: RetrievalClient,
        completions: CompletionClient,
        retrieval: RetrievalParams,
    ) -> Self {
        Self {
            embedder,
            retriever,
            completions,
            retrieval,
        }
    }

    /// Build every handle from configuration, using Qdrant as the index.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let index: Arc<dyn VectorIndex> = Arc::new(QdrantIndex::new(&config.index)?);
        Self::with_index(config, index)
    }

    /// Build the HTTP clients from configuration around an existing index.
    pub fn with_index(config: &Config, index: Arc<dyn VectorIndex>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.generation.connect_timeout())
            .build()?;

        Ok(Self::new(
            EmbeddingClient::new(http.clone(), &config.embedding),
            RetrievalClient::new(index),
            CompletionClient::new(http, &config.generation),
            RetrievalParams::from(&config.retrieval),
        ))
    }

    pub fn embedder(&self) -> &EmbeddingClient {
        &self.embedder
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        self.retrieval
    }

    /// Embed `query`, search its collection, and keep the relevant passages.
    ///
    /// A missing collection yields empty context.
    pub async fn retrieve(
        &self,
        query: &str,
        params: RetrievalParams,
    ) -> Result<Grounding, GatewayError> {
        if query.trim().is_empty() {
            return Err(GatewayError::EmptyQuery);
        }

        let embedded = self.embedder.embed(query).await?;
        let namespace = collection_name_for(&embedded.model);

        let candidates = match self
            .retriever
            .search_all(&namespace, &embedded.vectors, params.limit)
            .await
        {
            Ok(candidates) => candidates,
            Err(GatewayError::CollectionNotFound(name)) => {
                tracing::warn!(collection = %name, "Collection not found, answering without context");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let context = filter_relevant(&candidates, params.min_score);
        Ok(Grounding { namespace, context })
    }

    /// Run retrieval and assemble the grounded prompt.
    ///
    /// An empty query is rejected before any network call.
    #[tracing::instrument(name = "Preparing prompt", skip(self, query))]
    pub async fn prepare(&self, query: &str) -> Result<Vec<PromptMessage>, GatewayError> {
        if query.trim().is_empty() {
            return Err(GatewayError::EmptyQuery);
        }
        let grounding = self.retrieve(query, self.retrieval).await?;
        tracing::info!(
            collection = %grounding.namespace,
            passages = grounding.context.len(),
            "Retrieved context"
        );
        assemble_prompt(&grounding.context, query)
    }

    /// Prepare the prompt and open the completion stream.
    ///
    /// Every error that can be reported as a structured response happens
    /// here, before the first chunk is produced.
    pub async fn answer(
        &self,
        query: &str,
        temperature: f32,
    ) -> Result<CompletionStream, GatewayError> {
        check_temperature(temperature)?;
        let messages = self.prepare(query).await?;
        self.completions.open(&messages, temperature).await
    }

    /// Run the whole pipeline, relaying each chunk to `on_chunk`.
    pub async fn answer_with<F>(
        &self,
        query: &str,
        temperature: f32,
        on_chunk: F,
    ) -> Result<(), GatewayError>
    where
        F: FnMut(CompletionChunk) -> Result<(), GatewayError>,
    {
        check_temperature(temperature)?;
        let messages = self.prepare(query).await?;
        self.completions
            .stream(&messages, temperature, on_chunk)
            .await
    }
}

/// Same bounds `Config::validate` enforces on `[generation].temperature`.
fn check_temperature(temperature: f32) -> Result<(), GatewayError> {
    if temperature.is_finite() && (0.0..=2.0).contains(&temperature) {
        Ok(())
    } else {
        Err(GatewayError::InvalidTemperature(temperature))
    }
}
