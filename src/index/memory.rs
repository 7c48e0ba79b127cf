//! In-process vector store. Contents are lost when the process exits.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{IndexDocument, ScoredDocument, VectorStore, rank};
use crate::catalog::RecordId;
use crate::error::AppError;

#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<(IndexDocument, Vec<f32>)>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<(IndexDocument, Vec<f32>)>>, AppError> {
        self.entries
            .read()
            .map_err(|_| AppError::Store("index: memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<(IndexDocument, Vec<f32>)>>, AppError> {
        self.entries
            .write()
            .map_err(|_| AppError::Store("index: memory store lock poisoned".into()))
    }
}

impl VectorStore for MemoryVectorStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn put(&self, document: &IndexDocument, embedding: &[f32]) -> Result<(), AppError> {
        let record_id = document.record_id();
        let mut entries = self.write()?;
        entries.retain(|(existing, _)| {
            existing.id != document.id
                && (record_id.is_none() || existing.record_id() != record_id)
        });
        entries.push((document.clone(), embedding.to_vec()));
        Ok(())
    }

    fn nearest(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, AppError> {
        let entries = self.read()?;
        Ok(rank(query, entries.iter().cloned(), top_k, min_score))
    }

    fn remove_record(&self, record_id: RecordId) -> Result<usize, AppError> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|(doc, _)| doc.record_id() != Some(record_id));
        Ok(before - entries.len())
    }

    fn len(&self) -> Result<usize, AppError> {
        Ok(self.read()?.len())
    }
}
