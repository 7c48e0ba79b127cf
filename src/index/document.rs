//! Index documents and scored search hits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::catalog::RecordId;

/// Metadata key tying a document back to its catalog record.
pub const RECORD_ID_KEY: &str = "recordId";

/// Text summary of one catalog record, as stored in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Fresh UUID per document; unrelated to the record identifier.
    pub id: String,
    pub body: String,
    /// Short text that bag-of-words embedders match queries against.
    /// Defaults to the body.
    #[serde(default)]
    pub key: String,
    /// Sorted, so rendering is deterministic.
    pub metadata: BTreeMap<String, String>,
}

impl IndexDocument {
    /// New document with a generated identifier.
    pub fn new(body: impl Into<String>, metadata: BTreeMap<String, String>) -> Self {
        let body = body.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key: body.clone(),
            body,
            metadata,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The `recordId` tag parsed back to a [`RecordId`], if present and valid.
    pub fn record_id(&self) -> Option<RecordId> {
        self.metadata.get(RECORD_ID_KEY)?.parse().ok()
    }

    /// Lowercase hex SHA-256 of `body`.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.body.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Metadata lines (`key: value`), a blank line, then the body.
    ///
    /// This is what the model sees, so the record identifier travels with
    /// the summary.
    pub fn render(&self) -> String {
        if self.metadata.is_empty() {
            return self.body.clone();
        }
        let meta = self
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{meta}\n\n{}", self.body)
    }
}

/// A similarity hit. `score` is cosine similarity, higher is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: IndexDocument,
    pub score: f32,
}
