//! Retrieve-and-reconcile search pipeline.
//!
//! ```text
//! write:  record ──save──▶ CatalogStore
//!                └─indexer─▶ VectorIndex.upsert
//!
//! query:  text ─▶ context ─▶ prompt ─▶ LlmProvider ─▶ parser ─▶ reconcile ─▶ records
//!                 (VectorIndex)                                 (CatalogStore)
//! ```
//!
//! Model output is only ever used for its candidate ids; every record a
//! query returns is re-read from the catalog.

pub mod context;
pub mod error;
pub mod indexer;
pub mod parser;
pub mod prompt;
pub mod reconcile;
pub mod service;

use std::fmt;

pub use context::{AssembledContext, MIN_SCORE, TOP_K, assemble_context};
pub use error::{ErrorKind, ServiceError};
pub use indexer::{build_document, render_summary, search_key};
pub use parser::{RawCandidate, SearchCandidate, parse_candidates, validate_candidates};
pub use prompt::PromptTemplate;
pub use reconcile::{Reconciled, reconcile};
pub use service::{CatalogService, ReindexSummary, SearchReport};

/// Lifecycle of a single query. Logged at `debug` as the `stage` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    ContextAssembled,
    PromptBuilt,
    CompletionRequested,
    Parsed,
    Reconciled,
    Returned,
    Errored,
}

impl QueryStage {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStage::Received => "received",
            QueryStage::ContextAssembled => "context_assembled",
            QueryStage::PromptBuilt => "prompt_built",
            QueryStage::CompletionRequested => "completion_requested",
            QueryStage::Parsed => "parsed",
            QueryStage::Reconciled => "reconciled",
            QueryStage::Returned => "returned",
            QueryStage::Errored => "errored",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(QueryStage::ContextAssembled.to_string(), "context_assembled");
        assert_eq!(QueryStage::Errored.to_string(), "errored");
    }
}
