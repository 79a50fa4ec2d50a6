//! Query modules, one per table family. All functions take a plain
//! `&Connection` so they compose under the caller's transaction.

pub mod batch_ops;
pub mod history_ops;
pub mod registry_ops;
pub mod task_claim;

use chrono::{DateTime, Utc};

use loam_core::errors::LoamResult;

use crate::to_storage_err;

/// Single timestamp format for every column we write: millisecond UTC with a
/// trailing Z, matching the schema defaults, so lexicographic order equals
/// chronological order.
pub(crate) fn fmt_ts(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub(crate) fn parse_ts(s: &str) -> LoamResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("parse timestamp '{s}': {e}")))
}
