//! The single write connection. All mutations in the entire system go
//! through this one serialized connection; SQLite's single-writer model is
//! what makes task claiming exactly-once.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use loam_core::errors::LoamResult;

use super::pragmas::apply_pragmas;
use crate::to_storage_err;

/// The sole write connection, behind a mutex.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open the write connection for the given database file.
    pub fn open(path: &Path) -> LoamResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory write connection (for testing).
    pub fn open_in_memory() -> LoamResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Execute a closure with exclusive access to the write connection.
    pub fn with_conn_sync<F, T>(&self, f: F) -> LoamResult<T>
    where
        F: FnOnce(&Connection) -> LoamResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("write connection lock poisoned: {e}")))?;
        f(&guard)
    }
}
