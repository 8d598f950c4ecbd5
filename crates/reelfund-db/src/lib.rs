//! # reelfund-db
//!
//! SQLite storage layer for the Reelfund daemon.
//! Manages the single database at `$REELFUND_DATA_DIR/reelfund.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - All money is integer cents (u64), percentages basis points
//! - Schema version stored in `PRAGMA user_version`
//!
//! The at-most-once guarantees of the distribution pipeline live here as
//! UNIQUE constraints: `revenue_entries(source, external_ref)` and
//! `royalty_distributions(entry_id)`.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Whether the error is a SQLite UNIQUE (or PRIMARY KEY) constraint
    /// violation.
    ///
    /// Used by the ingest and distribution paths to turn a constraint
    /// hit into a duplicate/already-distributed outcome. The extended
    /// result code matters: foreign-key and NOT NULL failures share the
    /// primary constraint code and must keep surfacing as errors.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the Reelfund database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_wal_mode() {
        let conn = open_memory().expect("open");
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("get journal_mode");
        // In-memory databases use "memory" mode, not WAL
        assert!(mode == "wal" || mode == "memory");
    }

    #[test]
    fn test_unique_violation_detected() {
        let conn = open_memory().expect("open");
        let insert = "INSERT INTO settings (key, value) VALUES ('k', 'v')";
        conn.execute(insert, []).expect("first insert");

        let err: DbError = conn.execute(insert, []).expect_err("duplicate key").into();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_fk_violation_is_not_unique() {
        let conn = open_memory().expect("open");
        let err: DbError = conn
            .execute(
                "INSERT INTO investments (campaign_id, investor, amount_cents, invested_at)
                 VALUES (999, 'alice', 1, 0)",
                [],
            )
            .expect_err("missing campaign")
            .into();
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_memory().expect("open");
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }
}
