//! In-process catalog store. Contents are lost when the process exits.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{CatalogRecord, CatalogStore, RecordId};
use crate::error::AppError;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<RecordId, CatalogRecord>,
    last_id: RecordId,
}

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    inner: Mutex<Inner>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Store("catalog: memory store lock poisoned".into()))
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn save(&self, mut record: CatalogRecord) -> Result<CatalogRecord, AppError> {
        let mut inner = self.lock()?;
        let id = match record.id {
            Some(id) if id <= 0 => {
                return Err(AppError::Store(format!("catalog: invalid record id {id}")));
            }
            Some(id) => id,
            None => inner.last_id + 1,
        };
        inner.last_id = inner.last_id.max(id);
        record.id = Some(id);
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    fn find_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, AppError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    fn find_all_by_id(&self, ids: &[RecordId]) -> Result<Vec<CatalogRecord>, AppError> {
        let inner = self.lock()?;
        let mut wanted: Vec<RecordId> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .into_iter()
            .filter_map(|id| inner.records.get(&id).cloned())
            .collect())
    }

    fn find_all(&self) -> Result<Vec<CatalogRecord>, AppError> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    fn delete_by_id(&self, id: RecordId) -> Result<bool, AppError> {
        Ok(self.lock()?.records.remove(&id).is_some())
    }
}
