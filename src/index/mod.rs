//! Vector index abstraction and the retrieval client built on it.
//!
//! The [`VectorIndex`] trait is the seam between the pipeline and the
//! storage engine. Two backends ship with the crate:
//!
//! - **[`QdrantIndex`]**: the production backend, talking gRPC to Qdrant.
//! - **[`MemoryIndex`]**: brute-force cosine similarity over in-memory
//!   collections, for tests and embedded use.
//!
//! [`RetrievalClient`] wraps an index handle and adds the multi-vector
//! contract: one search per query vector, issued concurrently, results
//! concatenated in vector order.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::models::{Namespace, RetrievalCandidate};

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

/// Nearest-neighbour search over named collections.
///
/// Implementations must be `Send + Sync`; one handle is shared by every
/// in-flight request.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return at most `limit` candidates closest to `vector`, best first.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::CollectionNotFound`] when `namespace` does not exist.
    /// - [`GatewayError::IndexUnavailable`] for any other failure.
    async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, GatewayError>;
}

/// Retrieval front-end over a shared [`VectorIndex`] handle.
#[derive(Clone)]
pub struct RetrievalClient {
    index: Arc<dyn VectorIndex>,
}

impl RetrievalClient {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Search one vector. Candidates keep the index's ordering.
    pub async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, GatewayError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.index.search(namespace, vector, limit).await
    }

    /// Search every vector against the same namespace.
    ///
    /// Searches run concurrently. Each is limited to `limit` candidates
    /// independently, and results are concatenated in vector order. The
    /// first failure aborts the whole call.
    #[tracing::instrument(
        name = "Searching vector index",
        skip(self, vectors),
        fields(namespace = %namespace, vectors = vectors.len())
    )]
    pub async fn search_all(
        &self,
        namespace: &Namespace,
        vectors: &[Vec<f32>],
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, GatewayError> {
        let searches = vectors
            .iter()
            .map(|vector| self.search(namespace, vector, limit));
        let per_vector = try_join_all(searches).await?;

        let candidates: Vec<RetrievalCandidate> = per_vector.into_iter().flatten().collect();
        tracing::debug!(candidates = candidates.len(), "Search finished");
        Ok(candidates)
    }
}
