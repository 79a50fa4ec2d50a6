//! Round-robin set of read-only connections.
//!
//! The reader call sites are few and short-lived (task lookups, ledger and
//! registry queries, batch history), so a handful of connections is plenty.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use loam_core::errors::LoamResult;

use super::pragmas::apply_read_pragmas;
use crate::to_storage_err;

const MAX_READERS: usize = 8;

pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Open `count` read-only connections to the database at `path`. The
    /// count is clamped to 1..=MAX_READERS.
    pub fn open(path: &Path, count: usize) -> LoamResult<Self> {
        let readers = (0..count.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                apply_read_pragmas(&conn)?;
                Ok(Mutex::new(conn))
            })
            .collect::<LoamResult<Vec<_>>>()?;
        Ok(Self { readers, cursor: AtomicUsize::new(0) })
    }

    /// Hand the next reader to `f`.
    pub fn with_conn<F, T>(&self, f: F) -> LoamResult<T>
    where
        F: FnOnce(&Connection) -> LoamResult<T>,
    {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| to_storage_err(format!("reader lock poisoned: {e}")))?;
        f(&conn)
    }
}
