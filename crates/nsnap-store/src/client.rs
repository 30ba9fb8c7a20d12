//! SQLite connection management and schema for the snapshot database.

use std::path::Path;

use nsnap_core::{HostId, RunTimestamp};
use rusqlite::{Connection, Transaction};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Refusing to store empty diff text for host {host_id} at run {run}")]
    EmptyDiff { host_id: HostId, run: RunTimestamp },

    #[error("Failed to prepare database directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Schema for the three collections. Table and column names are shared with
/// the web viewer, which reads the same file.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS hosts (
    id      INTEGER PRIMARY KEY,
    ip      TEXT NOT NULL UNIQUE,
    name    TEXT
);

CREATE TABLE IF NOT EXISTS fullscan (
    id       INTEGER NOT NULL REFERENCES hosts(id),
    updated  INTEGER NOT NULL,
    port     INTEGER NOT NULL CHECK (port BETWEEN 0 AND 65535),
    protocol TEXT NOT NULL,
    state    TEXT NOT NULL,
    service  TEXT
);
CREATE INDEX IF NOT EXISTS fullscan_updated_idx ON fullscan(updated);
CREATE INDEX IF NOT EXISTS fullscan_id_updated_idx ON fullscan(id, updated);

CREATE TABLE IF NOT EXISTS diffscan (
    id      INTEGER NOT NULL REFERENCES hosts(id),
    updated INTEGER NOT NULL,
    diff    TEXT NOT NULL CHECK (length(diff) > 0),
    comment TEXT
);
CREATE INDEX IF NOT EXISTS diffscan_updated_idx ON diffscan(updated);
CREATE INDEX IF NOT EXISTS diffscan_id_updated_idx ON diffscan(id, updated);
"#;

/// Handle on the snapshot database.
///
/// Single-writer: one ingestion cycle owns the store for its whole duration.
/// Readers in other processes rely on SQLite's per-statement atomicity.
pub struct SnapshotStore {
    pub(crate) conn: Connection,
}

impl SnapshotStore {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        let store = Self::initialize(conn)?;

        tracing::debug!(path = %path.display(), journal_mode = %mode, "Snapshot database opened");
        Ok(store)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Begin a transaction on the underlying connection.
    ///
    /// Every store call made while the returned guard is alive runs inside
    /// it. Dropping the guard without `commit()` rolls everything back.
    pub fn begin(&self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.unchecked_transaction()?)
    }
}
