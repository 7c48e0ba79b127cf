//! Context assembler: similarity search → one context blob for the prompt.

use crate::error::AppError;
use crate::index::{ScoredDocument, VectorIndex};

/// Maximum number of documents placed in the context.
pub const TOP_K: usize = 5;

/// Minimum cosine similarity for a document to be considered relevant.
pub const MIN_SCORE: f32 = 0.70;

/// Retrieved documents and their rendered concatenation.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    /// Rendered documents, one per line, in index order. Empty when nothing
    /// cleared the threshold.
    pub text: String,
    pub matches: Vec<ScoredDocument>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Join rendered documents, each followed by a newline, keeping their order.
pub fn join_documents(matches: &[ScoredDocument]) -> String {
    let mut text = String::new();
    for hit in matches {
        text.push_str(&hit.document.render());
        text.push('\n');
    }
    text
}

/// Run the fixed-policy similarity search (`TOP_K`, `MIN_SCORE`) for `query`.
pub async fn assemble_context<V: VectorIndex>(
    index: &V,
    query: &str,
) -> Result<AssembledContext, AppError> {
    let matches = index.similarity_search(query, TOP_K, MIN_SCORE).await?;
    Ok(AssembledContext { text: join_documents(&matches), matches })
}
