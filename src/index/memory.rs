//! In-memory [`VectorIndex`] implementation for testing and embedded use.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every point of the collection.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{Namespace, RetrievalCandidate};

use super::VectorIndex;

struct StoredPoint {
    id: String,
    vector: Vec<f32>,
    payload: serde_json::Map<String, serde_json::Value>,
}

/// In-memory vector index keyed by collection name.
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Vec<StoredPoint>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty collection. No-op if it already exists.
    pub fn create_collection(&self, namespace: &Namespace) {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections.entry(namespace.to_string()).or_default();
    }

    /// Insert a point, creating the collection on first use.
    ///
    /// Non-object payloads are stored as an empty map.
    pub fn insert(
        &self,
        namespace: &Namespace,
        id: impl Into<String>,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) {
        let payload = match payload {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(namespace.to_string())
            .or_default()
            .push(StoredPoint {
                id: id.into(),
                vector,
                payload,
            });
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, GatewayError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let points = collections
            .get(namespace.as_str())
            .ok_or_else(|| GatewayError::CollectionNotFound(namespace.to_string()))?;

        let mut scored: Vec<RetrievalCandidate> = points
            .iter()
            .map(|p| RetrievalCandidate {
                id: p.id.clone(),
                score: cosine_sim(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }
}
