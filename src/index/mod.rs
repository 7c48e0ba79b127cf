//! Vector index collaborator.
//!
//! Two layers:
//!
//! - [`VectorStore`]: blocking storage of `(document, embedding)` pairs with
//!   brute-force nearest-neighbour lookup. Implemented by
//!   [`memory::MemoryVectorStore`] and `sqlite::SqliteVectorStore`.
//! - [`VectorIndex`]: the async interface the search pipeline talks to:
//!   `upsert(document)` and `similarity_search(query, top_k, min_score)`.
//!   [`EmbeddingIndex`] implements it by pairing an [`Embedder`] with a
//!   `VectorStore`; store calls run on the blocking thread pool.
//!
//! A record has at most one live document: `put` supersedes any earlier
//! document tagged with the same `recordId`.

pub mod document;
pub mod embedder;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

pub use document::{IndexDocument, RECORD_ID_KEY, ScoredDocument};
pub use embedder::Embedder;

use crate::catalog::RecordId;
use crate::error::AppError;

/// Blocking document + embedding storage.
pub trait VectorStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &str;

    /// Insert `document`, replacing any document with the same id or the
    /// same `recordId` tag.
    fn put(&self, document: &IndexDocument, embedding: &[f32]) -> Result<(), AppError>;

    /// Up to `top_k` documents scoring at least `min_score` against `query`,
    /// best first.
    fn nearest(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, AppError>;

    /// Drop every document tagged with `record_id`; returns how many.
    fn remove_record(&self, record_id: RecordId) -> Result<usize, AppError>;

    fn len(&self) -> Result<usize, AppError>;
}

/// Async similarity index used by the search pipeline.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, document: IndexDocument) -> impl Future<Output = Result<(), AppError>> + Send;

    fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> impl Future<Output = Result<Vec<ScoredDocument>, AppError>> + Send;

    fn remove_record(
        &self,
        record_id: RecordId,
    ) -> impl Future<Output = Result<usize, AppError>> + Send;
}

/// [`VectorIndex`] built from an embedder and a blocking vector store.
#[derive(Clone)]
pub struct EmbeddingIndex {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Embedder, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    async fn blocking<T, F>(&self, op: &str, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VectorStore) -> Result<T, AppError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| AppError::Store(format!("index {op}: blocking task failed: {e}")))?
    }
}

impl VectorIndex for EmbeddingIndex {
    async fn upsert(&self, document: IndexDocument) -> Result<(), AppError> {
        let embedding = self.embedder.embed(self.embedder.document_text(&document)).await?;
        debug!(
            doc_id = %document.id,
            embedder = self.embedder.name(),
            dims = embedding.len(),
            "upserting index document"
        );
        self.blocking("upsert", move |store| store.put(&document, &embedding)).await
    }

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, AppError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        self.blocking("similarity_search", move |store| {
            store.nearest(&embedding, top_k, min_score)
        })
        .await
    }

    async fn remove_record(&self, record_id: RecordId) -> Result<usize, AppError> {
        self.blocking("remove_record", move |store| store.remove_record(record_id)).await
    }
}

/// Cosine similarity in `[-1, 1]`; `0.0` for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Score `candidates` against `query`, keep those `>= min_score`, best first,
/// at most `top_k`. Ties keep input order.
pub(crate) fn rank<I>(query: &[f32], candidates: I, top_k: usize, min_score: f32) -> Vec<ScoredDocument>
where
    I: IntoIterator<Item = (IndexDocument, Vec<f32>)>,
{
    if top_k == 0 {
        return Vec::new();
    }
    let mut hits: Vec<ScoredDocument> = candidates
        .into_iter()
        .map(|(document, embedding)| ScoredDocument {
            score: cosine_similarity(query, &embedding),
            document,
        })
        .filter(|hit| hit.score >= min_score)
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k);
    hits
}
