//! Reconciler: candidate ids → authoritative catalog records.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use super::{SearchCandidate, ServiceError};
use crate::catalog::{CatalogRecord, CatalogStore, RecordId};

/// Records found for a candidate list, plus the ids the catalog lacked.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Catalog records in candidate order, each at most once.
    pub records: Vec<CatalogRecord>,
    /// Candidate ids with no catalog record.
    pub dropped: Vec<RecordId>,
}

/// Candidate ids in emission order with repeats removed.
pub fn unique_ids(candidates: &[SearchCandidate]) -> Vec<RecordId> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(|c| c.id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Arrange looked-up records in `ids` order; ids without a record are dropped.
pub fn order_by_candidates(ids: &[RecordId], found: Vec<CatalogRecord>) -> Reconciled {
    let mut by_id: HashMap<RecordId, CatalogRecord> = found
        .into_iter()
        .filter_map(|r| r.id.map(|id| (id, r)))
        .collect();

    let mut out = Reconciled::default();
    for id in ids {
        match by_id.remove(id) {
            Some(record) => out.records.push(record),
            None => out.dropped.push(*id),
        }
    }
    out
}

/// One batched catalog lookup for the candidates' ids.
pub async fn reconcile(
    catalog: &Arc<dyn CatalogStore>,
    candidates: &[SearchCandidate],
) -> Result<Reconciled, ServiceError> {
    let ids = unique_ids(candidates);
    if ids.is_empty() {
        return Ok(Reconciled::default());
    }

    let store = Arc::clone(catalog);
    let lookup = ids.clone();
    let found = tokio::task::spawn_blocking(move || store.find_all_by_id(&lookup))
        .await
        .map_err(|e| ServiceError::Upstream(format!("catalog lookup task failed: {e}")))?
        .map_err(|e| ServiceError::Upstream(e.to_string()))?;

    let reconciled = order_by_candidates(&ids, found);
    for id in &reconciled.dropped {
        warn!(record_id = id, "model cited a record missing from the catalog; dropped");
    }
    Ok(reconciled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::record;
    use crate::catalog::memory::MemoryCatalogStore;

    fn candidate(id: RecordId) -> SearchCandidate {
        SearchCandidate { id, name: None, reason: None }
    }

    fn saved(id: RecordId, name: &str) -> CatalogRecord {
        let mut r = record(name, "Electronics", 10.0);
        r.id = Some(id);
        r
    }

    #[test]
    fn unique_ids_keeps_first_occurrence() {
        let c = [candidate(7), candidate(3), candidate(7), candidate(1)];
        assert_eq!(unique_ids(&c), vec![7, 3, 1]);
    }

    #[test]
    fn order_follows_candidates_and_reports_missing() {
        let found = vec![saved(1, "a"), saved(3, "c"), saved(7, "g")];
        let out = order_by_candidates(&[7, 99, 1], found);
        let ids: Vec<_> = out.records.iter().map(|r| r.id.unwrap()).collect();
        assert_eq!(ids, vec![7, 1]);
        assert_eq!(out.dropped, vec![99]);
    }

    #[tokio::test]
    async fn result_is_subset_of_catalog_and_candidates() {
        let store = MemoryCatalogStore::new();
        let a = store.save(record("Mouse", "Electronics", 19.99)).unwrap();
        let b = store.save(record("Lamp", "Home", 24.5)).unwrap();
        let catalog: Arc<dyn CatalogStore> = Arc::new(store);

        let (a_id, b_id) = (a.id.unwrap(), b.id.unwrap());
        let candidates = [candidate(b_id), candidate(500), candidate(a_id), candidate(b_id)];
        let out = reconcile(&catalog, &candidates).await.unwrap();

        assert_eq!(out.records, vec![b, a]);
        assert_eq!(out.dropped, vec![500]);
    }

    #[tokio::test]
    async fn no_candidates_means_no_records() {
        let catalog: Arc<dyn CatalogStore> = Arc::new(MemoryCatalogStore::new());
        let out = reconcile(&catalog, &[]).await.unwrap();
        assert!(out.records.is_empty());
        assert!(out.dropped.is_empty());
    }
}
