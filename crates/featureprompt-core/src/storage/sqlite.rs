//! SQLite-backed counter store.
//!
//! Values live in the `engagement_kv` table, one row per `(namespace, key)`,
//! encoded as tagged JSON. Every write is a single statement, so each key is
//! crash-consistent on its own.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use super::{data_dir, migrations, CounterStore, StoredValue};
use crate::error::{StoreError, StoreResult};

/// Counter store persisted to a SQLite database.
pub struct SqliteStore {
    conn: Connection,
    namespace: String,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, scoped to `namespace`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), namespace, "opened engagement store");
        Self::with_connection(conn, namespace)
    }

    /// Open the store at `<data_dir>/engagement.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database is unavailable.
    pub fn open_default(namespace: &str) -> StoreResult<Self> {
        Self::open(data_dir()?.join("engagement.db"), namespace)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory(namespace: &str) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, namespace)
    }

    fn with_connection(conn: Connection, namespace: &str) -> StoreResult<Self> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl CounterStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredValue>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM engagement_kv WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StoreError::Encoding {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn set(&mut self, key: &str, value: StoredValue) -> StoreResult<()> {
        let text = serde_json::to_string(&value).map_err(|e| StoreError::Encoding {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO engagement_kv (namespace, key, value) VALUES (?1, ?2, ?3)",
            params![self.namespace, key, text],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM engagement_kv WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }
}
