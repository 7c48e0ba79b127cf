//! `sqlite` vector store: documents and embeddings in `<dir>/index.db`.
//!
//! Embeddings are stored as little-endian `f32` blobs. Lookup is a full scan
//! scored in Rust; catalog-sized corpora stay well within that budget.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::Type;
use rusqlite::{Connection, params};

use super::{IndexDocument, RECORD_ID_KEY, ScoredDocument, VectorStore, rank};
use crate::catalog::RecordId;
use crate::error::AppError;
use crate::sqlite::{ensure_schema, now_iso8601, open_conn};

const DB_FILENAME: &str = "index.db";
const SCHEMA_VERSION: i64 = 1;
const LABEL: &str = "index";

const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        doc_id TEXT PRIMARY KEY,
        record_id TEXT,
        body TEXT NOT NULL,
        search_key TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS documents_record_id ON documents(record_id);

    PRAGMA user_version = 1;
";

#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    db_path: PathBuf,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the index database under `dir`.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::Store(format!("{LABEL}: cannot create {}: {e}", dir.display()))
        })?;
        let store = Self { db_path: dir.join(DB_FILENAME) };
        let conn = store.conn()?;
        ensure_schema(&conn, LABEL, SCHEMA_VERSION, SCHEMA_V1)?;
        Ok(store)
    }

    fn conn(&self) -> Result<Connection, AppError> {
        open_conn(&self.db_path, LABEL)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    fn put(&self, document: &IndexDocument, embedding: &[f32]) -> Result<(), AppError> {
        let metadata_json = serde_json::to_string(&document.metadata)
            .map_err(|e| AppError::Store(format!("{LABEL}: serialize metadata: {e}")))?;
        let record_tag = document.metadata.get(RECORD_ID_KEY);

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("{LABEL}: begin put tx: {e}")))?;

        if let Some(tag) = record_tag {
            tx.execute("DELETE FROM documents WHERE record_id = ?1", params![tag])
                .map_err(|e| AppError::Store(format!("{LABEL}: supersede record {tag}: {e}")))?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO documents
                (doc_id, record_id, body, search_key, content_hash, metadata, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                document.id,
                record_tag,
                document.body,
                document.key,
                document.content_hash(),
                metadata_json,
                encode_embedding(embedding),
                now_iso8601(),
            ],
        )
        .map_err(|e| AppError::Store(format!("{LABEL}: insert document: {e}")))?;

        tx.commit()
            .map_err(|e| AppError::Store(format!("{LABEL}: commit put tx: {e}")))
    }

    fn nearest(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, AppError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT doc_id, body, search_key, metadata, embedding
                 FROM documents ORDER BY created_at, doc_id",
            )
            .map_err(|e| AppError::Store(format!("{LABEL}: prepare nearest: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let metadata_json: String = row.get(3)?;
                let metadata = serde_json::from_str::<BTreeMap<String, String>>(&metadata_json)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
                    })?;
                let blob: Vec<u8> = row.get(4)?;
                Ok((
                    IndexDocument { id: row.get(0)?, body: row.get(1)?, key: row.get(2)?, metadata },
                    decode_embedding(&blob),
                ))
            })
            .map_err(|e| AppError::Store(format!("{LABEL}: query nearest: {e}")))?;

        let mut candidates = Vec::new();
        for row in rows {
            candidates
                .push(row.map_err(|e| AppError::Store(format!("{LABEL}: map nearest row: {e}")))?);
        }
        Ok(rank(query, candidates, top_k, min_score))
    }

    fn remove_record(&self, record_id: RecordId) -> Result<usize, AppError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM documents WHERE record_id = ?1",
            params![record_id.to_string()],
        )
        .map_err(|e| AppError::Store(format!("{LABEL}: remove record {record_id}: {e}")))
    }

    fn len(&self) -> Result<usize, AppError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| AppError::Store(format!("{LABEL}: count documents: {e}")))?;
        Ok(count as usize)
    }
}
