//! SQLite connection management.
//!
//! Every mutation in the system funnels through one serialized write
//! connection; that serialization is what makes task claims exactly-once.
//! Reads go to a small round-robin set of read-only connections, which WAL
//! keeps consistent while the writer commits.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::Path;

use loam_core::errors::LoamResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// One writer plus optional readers. An in-memory SQLite database is private
/// to its connection, so in-memory pools carry no readers and serve every
/// query from the writer.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    readers: Option<ReadPool>,
}

impl ConnectionPool {
    /// Open a file-backed pool with up to `readers` read-only connections.
    pub fn open(path: &Path, readers: usize) -> LoamResult<Self> {
        Ok(Self {
            writer: WriteConnection::open(path)?,
            readers: Some(ReadPool::open(path, readers)?),
        })
    }

    /// Open an in-memory pool (for testing). Writer only.
    pub fn open_in_memory() -> LoamResult<Self> {
        Ok(Self { writer: WriteConnection::open_in_memory()?, readers: None })
    }

    /// Run a read-only query on the next reader, or on the writer when the
    /// pool has none.
    pub fn read<F, T>(&self, f: F) -> LoamResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> LoamResult<T>,
    {
        match &self.readers {
            Some(readers) => readers.with_conn(f),
            None => self.writer.with_conn_sync(f),
        }
    }
}
