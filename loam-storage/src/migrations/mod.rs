//! Schema migrations, applied in order at engine startup. Version tracking
//! via `PRAGMA user_version`; each migration runs at most once per database.

mod v001_queue_tables;
mod v002_history_tables;
mod v003_batch_tables;

use rusqlite::Connection;

use loam_core::errors::{LoamError, LoamResult, StorageError};

use crate::to_storage_err;

type Migration = fn(&Connection) -> LoamResult<()>;

const MIGRATIONS: &[(u32, Migration)] = &[
    (1, v001_queue_tables::migrate),
    (2, v002_history_tables::migrate),
    (3, v003_batch_tables::migrate),
];

/// Run all pending migrations on the given connection.
pub fn run_migrations(conn: &Connection) -> LoamResult<()> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (version, migrate) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        migrate(conn).map_err(|e| {
            LoamError::Storage(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(version, "applied migration");
    }
    Ok(())
}

/// Highest known schema version.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}
