//! Classified pipeline failures.
//!
//! Callers branch on [`ServiceError::kind`]; the message carries detail for logs.

use thiserror::Error;

use crate::catalog::CatalogRecord;

/// Failure class, one per pipeline error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Template or other resource unreadable. Not retried.
    Configuration,
    /// Catalog store, vector index or completion client failed.
    Upstream,
    /// Model output was not a candidate list.
    Parse,
    /// Record rejected before any write.
    Invalid,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration failure: {0}")]
    Configuration(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The catalog write succeeded; only the index write failed. The saved
    /// record is returned so the caller keeps its identifier.
    #[error("record {} saved but not indexed: {reason}", record.id.unwrap_or_default())]
    NotIndexed {
        record: Box<CatalogRecord>,
        reason: String,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Configuration(_) => ErrorKind::Configuration,
            ServiceError::Upstream(_) | ServiceError::NotIndexed { .. } => ErrorKind::Upstream,
            ServiceError::Parse(_) => ErrorKind::Parse,
            ServiceError::InvalidRecord(_) => ErrorKind::Invalid,
        }
    }
}
