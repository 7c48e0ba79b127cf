//! `sqlite` catalog store: one row per record in `<dir>/catalog.db`.
//!
//! Each operation opens its own connection; WAL mode lets readers proceed
//! while another connection writes.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::{CatalogRecord, CatalogStore, ImagePayload, RecordId};
use crate::error::AppError;
use crate::sqlite::{ensure_schema, now_iso8601, open_conn};

const DB_FILENAME: &str = "catalog.db";
const SCHEMA_VERSION: i64 = 1;
const LABEL: &str = "catalog";

const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        brand TEXT NOT NULL,
        category TEXT NOT NULL,
        price REAL NOT NULL,
        release_date TEXT NOT NULL,
        available INTEGER NOT NULL,
        stock_quantity INTEGER NOT NULL,
        image_name TEXT,
        image_type TEXT,
        image_data BLOB,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    PRAGMA user_version = 1;
";

const SELECT_COLUMNS: &str = "SELECT id, name, description, brand, category, price, release_date,
    available, stock_quantity, image_name, image_type, image_data FROM records";

#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    db_path: PathBuf,
}

impl SqliteCatalogStore {
    /// Open (creating if needed) the catalog database under `dir`.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::Store(format!("{LABEL}: cannot create {}: {e}", dir.display()))
        })?;
        let store = Self { db_path: dir.join(DB_FILENAME) };
        let conn = store.conn()?;
        ensure_schema(&conn, LABEL, SCHEMA_VERSION, SCHEMA_V1)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, AppError> {
        open_conn(&self.db_path, LABEL)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<CatalogRecord> {
        let image_name: Option<String> = row.get(9)?;
        let image_type: Option<String> = row.get(10)?;
        let image_data: Option<Vec<u8>> = row.get(11)?;
        let image = match (image_name, image_type, image_data) {
            (Some(name), Some(content_type), Some(data)) => {
                Some(ImagePayload { name, content_type, data })
            }
            _ => None,
        };
        Ok(CatalogRecord {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            description: row.get(2)?,
            brand: row.get(3)?,
            category: row.get(4)?,
            price: row.get(5)?,
            release_date: row.get(6)?,
            available: row.get(7)?,
            stock_quantity: row.get(8)?,
            image,
        })
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        op: &str,
    ) -> Result<Vec<CatalogRecord>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Store(format!("{LABEL}: prepare {op}: {e}")))?;
        let rows = stmt
            .query_map(params, Self::map_row)
            .map_err(|e| AppError::Store(format!("{LABEL}: query {op}: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| AppError::Store(format!("{LABEL}: map {op} row: {e}")))?);
        }
        Ok(records)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    fn save(&self, mut record: CatalogRecord) -> Result<CatalogRecord, AppError> {
        if let Some(id) = record.id {
            if id <= 0 {
                return Err(AppError::Store(format!("{LABEL}: invalid record id {id}")));
            }
        }

        let conn = self.conn()?;
        let now = now_iso8601();
        let (image_name, image_type, image_data) = match &record.image {
            Some(img) => (Some(&img.name), Some(&img.content_type), Some(&img.data)),
            None => (None, None, None),
        };

        conn.execute(
            "INSERT INTO records (id, name, description, brand, category, price, release_date,
                available, stock_quantity, image_name, image_type, image_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                brand = excluded.brand,
                category = excluded.category,
                price = excluded.price,
                release_date = excluded.release_date,
                available = excluded.available,
                stock_quantity = excluded.stock_quantity,
                image_name = excluded.image_name,
                image_type = excluded.image_type,
                image_data = excluded.image_data,
                updated_at = excluded.updated_at",
            params![
                record.id,
                record.name,
                record.description,
                record.brand,
                record.category,
                record.price,
                record.release_date,
                record.available,
                record.stock_quantity,
                image_name,
                image_type,
                image_data,
                now,
            ],
        )
        .map_err(|e| AppError::Store(format!("{LABEL}: save record: {e}")))?;

        if record.id.is_none() {
            record.id = Some(conn.last_insert_rowid());
        }
        Ok(record)
    }

    fn find_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, AppError> {
        let conn = self.conn()?;
        conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], Self::map_row)
            .optional()
            .map_err(|e| AppError::Store(format!("{LABEL}: find_by_id {id}: {e}")))
    }

    fn find_all_by_id(&self, ids: &[RecordId]) -> Result<Vec<CatalogRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{SELECT_COLUMNS} WHERE id IN ({placeholders}) ORDER BY id");
        self.query_records(&sql, params_from_iter(ids.iter()), "find_all_by_id")
    }

    fn find_all(&self) -> Result<Vec<CatalogRecord>, AppError> {
        self.query_records(&format!("{SELECT_COLUMNS} ORDER BY id"), [], "find_all")
    }

    fn delete_by_id(&self, id: RecordId) -> Result<bool, AppError> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])
            .map_err(|e| AppError::Store(format!("{LABEL}: delete {id}: {e}")))?;
        Ok(removed > 0)
    }
}
