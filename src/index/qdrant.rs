//! Qdrant-backed [`VectorIndex`].
//!
//! Searches go through the gRPC points API with payloads enabled. The
//! Qdrant client only returns `anyhow` errors, so a missing collection is
//! recognised from the error text and reported as
//! [`GatewayError::CollectionNotFound`]; every other failure becomes
//! [`GatewayError::IndexUnavailable`].

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::prelude::{QdrantClient, QdrantClientConfig};
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, PointId, ScoredPoint, SearchPoints, Value,
};

use crate::config::IndexConfig;
use crate::error::GatewayError;
use crate::models::{Namespace, RetrievalCandidate};

use super::VectorIndex;

/// Vector index served by a Qdrant instance.
pub struct QdrantIndex {
    client: QdrantClient,
}

impl QdrantIndex {
    /// Build a client for the configured gRPC endpoint.
    ///
    /// No connection is made until the first search.
    pub fn new(config: &IndexConfig) -> anyhow::Result<Self> {
        let mut qdrant_config = QdrantClientConfig::from_url(&config.url);
        qdrant_config.timeout = config.timeout();
        qdrant_config.connect_timeout = config.timeout();
        let client = QdrantClient::new(Some(qdrant_config))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    #[tracing::instrument(name = "Querying Qdrant", skip(self, vector))]
    async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>, GatewayError> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: namespace.to_string(),
                vector: vector.to_vec(),
                limit: limit as u64,
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await
            .map_err(|e| classify_error(namespace, e))?;

        Ok(response.result.into_iter().map(to_candidate).collect())
    }
}

fn classify_error(namespace: &Namespace, err: anyhow::Error) -> GatewayError {
    let msg = format!("{:#}", err);
    if is_missing_collection(&msg) {
        GatewayError::CollectionNotFound(namespace.to_string())
    } else {
        GatewayError::IndexUnavailable(msg)
    }
}

/// Qdrant reports a missing collection as
/// ``Not found: Collection `name` doesn't exist!`` (gRPC `NotFound`).
fn is_missing_collection(msg: &str) -> bool {
    msg.contains("doesn't exist") || msg.contains("NotFound") || msg.contains("Not found")
}

fn to_candidate(point: ScoredPoint) -> RetrievalCandidate {
    RetrievalCandidate {
        id: point.id.map(point_id_to_string).unwrap_or_default(),
        score: point.score,
        payload: payload_to_json(point.payload),
    }
}

fn point_id_to_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u,
        None => String::new(),
    }
}

fn payload_to_json(payload: HashMap<String, Value>) -> serde_json::Map<String, serde_json::Value> {
    payload
        .into_iter()
        .map(|(k, v)| (k, value_to_json(v)))
        .collect()
}

fn value_to_json(value: Value) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(st)) => serde_json::Value::Object(payload_to_json(st.fields)),
    }
}
