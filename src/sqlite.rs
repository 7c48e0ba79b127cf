//! Shared SQLite plumbing for the persistent catalog and vector backends.
//!
//! - **Connection factory**: `open_conn` (WAL + foreign-keys + busy timeout).
//! - **Schema gate**: `ensure_schema` runs the DDL once and pins
//!   `PRAGMA user_version`.
//! - **Timestamps**: `now_iso8601`.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::AppError;

/// Open a SQLite connection to `db_path` and apply recommended pragmas.
///
/// - `journal_mode = WAL`: concurrent readers alongside a writer.
/// - `foreign_keys = ON`
/// - `busy_timeout = 5000`: wait up to 5 s before returning `SQLITE_BUSY`.
pub(crate) fn open_conn(db_path: &Path, label: &str) -> Result<Connection, AppError> {
    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Store(format!("{label}: open {}: {e}", db_path.display())))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| AppError::Store(format!("{label}: set journal_mode WAL: {e}")))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| AppError::Store(format!("{label}: set foreign_keys ON: {e}")))?;
    conn.pragma_update(None, "busy_timeout", 5000)
        .map_err(|e| AppError::Store(format!("{label}: set busy_timeout: {e}")))?;

    Ok(conn)
}

/// Create the schema on a fresh database, or verify the stored version.
///
/// `ddl` must end by setting `PRAGMA user_version` to `version`.
pub(crate) fn ensure_schema(
    conn: &Connection,
    label: &str,
    version: i64,
    ddl: &str,
) -> Result<(), AppError> {
    let current: i64 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(|e| AppError::Store(format!("{label}: read schema version: {e}")))?;

    if current == 0 {
        conn.execute_batch(ddl)
            .map_err(|e| AppError::Store(format!("{label}: initialize schema: {e}")))?;
        return Ok(());
    }

    if current != version {
        return Err(AppError::Store(format!(
            "{label}: unsupported schema version {current}, expected {version}"
        )));
    }
    Ok(())
}

/// Current UTC time as RFC 3339 with second precision, e.g. `"2025-04-01T12:00:00Z"`.
pub(crate) fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
