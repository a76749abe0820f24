//! Core data models used throughout gorag.
//!
//! These types represent the embeddings, retrieval candidates, prompt
//! messages and completion chunks that flow through the retrieval-augmented
//! completion pipeline.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A fixed-length embedding produced by one model.
pub type EmbeddingVector = Vec<f32>;

/// Vectors returned by one embedding request, plus the model that made them.
///
/// `model` is never empty when `vectors` is non-empty; the embedding client
/// rejects responses that break this.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub model: String,
    pub vectors: Vec<EmbeddingVector>,
}

/// Name of one retrieval collection, derived from a model identity.
///
/// Built by [`collection_name_for`](crate::collection::collection_name_for).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub(crate) fn new(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A scored neighbour returned by the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    /// Point identifier, rendered as a string (numeric ids or UUIDs).
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Point payload. The `source` field holds the passage text.
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Speaker of a [`PromptMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of a chat-style prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One unit of streamed output from the generation service.
///
/// The bytes are relayed exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChunk(Bytes);

impl CompletionChunk {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The chunk as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(PromptMessage::system("ctx")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "ctx"}));
        let json = serde_json::to_value(PromptMessage::user("q")).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_namespace_serializes_as_plain_string() {
        let ns = Namespace::new("foo-bar".to_string());
        assert_eq!(serde_json::to_value(&ns).unwrap(), serde_json::json!("foo-bar"));
    }

    #[test]
    fn test_chunk_is_verbatim() {
        let chunk = CompletionChunk::new("data: {\"x\":1}\n");
        assert_eq!(chunk.as_bytes(), b"data: {\"x\":1}\n");
        assert_eq!(chunk.as_str(), Some("data: {\"x\":1}\n"));
    }
}
