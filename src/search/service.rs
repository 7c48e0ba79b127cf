//! `CatalogService`: catalog CRUD with indexing on write and semantic search.
//!
//! Collaborators are passed to [`CatalogService::new`]; the service holds no
//! per-query state, so one instance serves concurrent queries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::assemble_context;
use super::indexer::build_document;
use super::parser::{SearchCandidate, parse_candidates};
use super::prompt::PromptTemplate;
use super::reconcile::reconcile;
use super::{QueryStage, ServiceError};
use crate::catalog::{CatalogRecord, CatalogStore, ImagePayload, RecordId};
use crate::error::AppError;
use crate::index::VectorIndex;
use crate::llm::{LlmProvider, LlmUsage};

/// Everything a query produced, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    /// Authoritative records, in the order the model ranked them.
    pub records: Vec<CatalogRecord>,
    pub candidates: Vec<SearchCandidate>,
    /// Documents that cleared the similarity threshold.
    pub context_matches: usize,
    /// Candidate ids the catalog does not hold.
    pub dropped: Vec<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexSummary {
    pub indexed: usize,
    pub failed: Vec<RecordId>,
}

pub struct CatalogService<V: VectorIndex> {
    catalog: Arc<dyn CatalogStore>,
    index: V,
    llm: LlmProvider,
    prompt_template: PathBuf,
}

impl<V: VectorIndex> CatalogService<V> {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        index: V,
        llm: LlmProvider,
        prompt_template: impl Into<PathBuf>,
    ) -> Self {
        Self { catalog, index, llm, prompt_template: prompt_template.into() }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub fn prompt_template(&self) -> &Path {
        &self.prompt_template
    }

    // ── catalog operations ────────────────────────────────────────────────

    pub async fn list(&self) -> Result<Vec<CatalogRecord>, ServiceError> {
        self.blocking("list", |store| store.find_all()).await
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<CatalogRecord>, ServiceError> {
        self.blocking("get", move |store| store.find_by_id(id)).await
    }

    /// Validate, persist, then index `record`.
    ///
    /// A non-empty `image` replaces the record's image. The catalog write and
    /// the index write are independent: when indexing fails the record stays
    /// saved and comes back inside [`ServiceError::NotIndexed`].
    pub async fn save(
        &self,
        mut record: CatalogRecord,
        image: Option<ImagePayload>,
    ) -> Result<CatalogRecord, ServiceError> {
        if let Some(image) = image.filter(|i| !i.is_empty()) {
            record.image = Some(image);
        }
        record.validate().map_err(ServiceError::InvalidRecord)?;

        let saved = self.blocking("save", move |store| store.save(record)).await?;
        let id = saved.id.unwrap_or_default();
        info!(record_id = id, name = %saved.name, "catalog record saved");

        if let Err(e) = self.index_record(&saved).await {
            warn!(record_id = id, error = %e, "record saved but index write failed");
            return Err(ServiceError::NotIndexed { record: Box::new(saved), reason: e.to_string() });
        }
        Ok(saved)
    }

    /// Remove a record and, best-effort, its index documents.
    pub async fn delete(&self, id: RecordId) -> Result<bool, ServiceError> {
        let removed = self.blocking("delete", move |store| store.delete_by_id(id)).await?;
        if removed {
            match self.index.remove_record(id).await {
                Ok(docs) => debug!(record_id = id, docs, "index documents removed"),
                Err(e) => warn!(record_id = id, error = %e, "index cleanup failed after delete"),
            }
            info!(record_id = id, "catalog record deleted");
        }
        Ok(removed)
    }

    /// Rebuild the index document of every catalog record.
    pub async fn reindex_all(&self) -> Result<ReindexSummary, ServiceError> {
        let records = self.list().await?;
        let mut summary = ReindexSummary::default();
        for record in &records {
            let id = record.id.unwrap_or_default();
            match self.index_record(record).await {
                Ok(()) => summary.indexed += 1,
                Err(e) => {
                    warn!(record_id = id, error = %e, "reindex failed for record");
                    summary.failed.push(id);
                }
            }
        }
        info!(indexed = summary.indexed, failed = summary.failed.len(), "reindex complete");
        Ok(summary)
    }

    // ── query path ────────────────────────────────────────────────────────

    /// Natural-language search; returns authoritative records only.
    pub async fn search(&self, query: &str) -> Result<Vec<CatalogRecord>, ServiceError> {
        Ok(self.search_report(query).await?.records)
    }

    pub async fn search_report(&self, query: &str) -> Result<SearchReport, ServiceError> {
        let query_id = Uuid::new_v4();
        let mut stage = QueryStage::Received;
        debug!(%query_id, %stage, query_len = query.len(), "query stage");

        match self.run_query(query_id, query, &mut stage).await {
            Ok(report) => {
                debug!(%query_id, stage = %QueryStage::Returned, records = report.records.len(), "query stage");
                Ok(report)
            }
            Err(e) => {
                debug!(%query_id, stage = %QueryStage::Errored, failed_at = %stage, kind = ?e.kind(), "query stage");
                warn!(%query_id, error = %e, "search failed");
                Err(e)
            }
        }
    }

    /// Runs the query stages in order. `stage` names the step in progress,
    /// so on error it holds the stage that failed.
    async fn run_query(
        &self,
        query_id: Uuid,
        query: &str,
        stage: &mut QueryStage,
    ) -> Result<SearchReport, ServiceError> {
        let reached = |s: QueryStage| debug!(%query_id, stage = %s, "query stage");

        *stage = QueryStage::ContextAssembled;
        let context = assemble_context(&self.index, query)
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        reached(*stage);

        *stage = QueryStage::PromptBuilt;
        let template = PromptTemplate::load(&self.prompt_template).await?;
        let prompt = template.render(query, &context.text);
        reached(*stage);

        *stage = QueryStage::CompletionRequested;
        let response = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        reached(*stage);

        *stage = QueryStage::Parsed;
        let candidates = parse_candidates(&response.text)?;
        reached(*stage);

        *stage = QueryStage::Reconciled;
        let reconciled = reconcile(&self.catalog, &candidates).await?;
        reached(*stage);

        Ok(SearchReport {
            query: query.to_string(),
            records: reconciled.records,
            candidates,
            context_matches: context.matches.len(),
            dropped: reconciled.dropped,
            usage: response.usage,
        })
    }

    // ── helpers ───────────────────────────────────────────────────────────

    async fn index_record(&self, record: &CatalogRecord) -> Result<(), AppError> {
        let document = build_document(record)?;
        self.index.upsert(document).await
    }

    async fn blocking<T, F>(&self, op: &str, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CatalogStore) -> Result<T, AppError> + Send + 'static,
    {
        let store = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ServiceError::Upstream(format!("catalog {op}: blocking task failed: {e}")))?
            .map_err(|e| ServiceError::Upstream(e.to_string()))
    }
}
