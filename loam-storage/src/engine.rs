//! StorageEngine — owns the ConnectionPool, runs migrations at startup, and
//! exposes the queue, ledger, registry, and batch bookkeeping APIs.

use std::path::Path;

use chrono::{DateTime, Utc};

use loam_core::errors::LoamResult;
use loam_core::knowledge::KnowledgeType;
use loam_core::models::{
    BackupRecord, BatchJob, FeedbackTask, HistoryRecord, RegistryEntry, TaskStatus,
};

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries;

/// The main storage engine. Owns the connection pool and provides the whole
/// persistence surface of the system.
pub struct StorageEngine {
    pool: ConnectionPool,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path) -> LoamResult<Self> {
        let engine = Self { pool: ConnectionPool::open(path, 4)? };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing).
    pub fn open_in_memory() -> LoamResult<Self> {
        let engine = Self { pool: ConnectionPool::open_in_memory()? };
        engine.initialize()?;
        Ok(engine)
    }

    /// Run migrations on the writer.
    fn initialize(&self) -> LoamResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            migrations::run_migrations(conn)?;
            Ok(())
        })
    }

    /// Get a reference to the connection pool (for advanced operations).
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Execute a read-only query on the best available connection.
    fn with_reader<F, T>(&self, f: F) -> LoamResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> LoamResult<T>,
    {
        self.pool.read(f)
    }

    // --- Task queue ---

    pub fn enqueue_task(&self, task: &FeedbackTask) -> LoamResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::task_claim::enqueue(conn, task))
    }

    /// Claim up to `limit` pending tasks for `consumer`, exactly once.
    pub fn claim_tasks(&self, limit: u32, consumer: &str) -> LoamResult<Vec<FeedbackTask>> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::task_claim::claim(conn, limit, consumer, Utc::now()))
    }

    pub fn complete_task(&self, id: &str) -> LoamResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::task_claim::complete(conn, id, Utc::now()))
    }

    pub fn fail_task(&self, id: &str, error: &str) -> LoamResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::task_claim::fail(conn, id, error, Utc::now()))
    }

    /// Return stale claims (older than `cutoff`) to pending.
    pub fn reclaim_stale_tasks(&self, cutoff: DateTime<Utc>) -> LoamResult<usize> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::task_claim::reclaim_stale(conn, cutoff, Utc::now()))
    }

    pub fn get_task(&self, id: &str) -> LoamResult<Option<FeedbackTask>> {
        self.with_reader(|conn| queries::task_claim::get_task(conn, id))
    }

    pub fn task_count(&self, status: TaskStatus) -> LoamResult<usize> {
        self.with_reader(|conn| queries::task_claim::count_by_status(conn, status))
    }

    // --- History ledger ---

    pub fn append_history(&self, record: &HistoryRecord) -> LoamResult<i64> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::history_ops::append(conn, record))
    }

    pub fn history_for_item(
        &self,
        knowledge_type: KnowledgeType,
        knowledge_id: &str,
        limit: usize,
    ) -> LoamResult<Vec<HistoryRecord>> {
        self.with_reader(|conn| {
            queries::history_ops::for_item(conn, knowledge_type, knowledge_id, limit)
        })
    }

    pub fn history_for_job(&self, job_id: &str) -> LoamResult<Vec<HistoryRecord>> {
        self.with_reader(|conn| queries::history_ops::for_job(conn, job_id))
    }

    pub fn history_for_agent(&self, agent_id: &str, limit: usize) -> LoamResult<Vec<HistoryRecord>> {
        self.with_reader(|conn| queries::history_ops::for_agent(conn, agent_id, limit))
    }

    // --- Registry ---

    pub fn upsert_registry(&self, entry: &RegistryEntry) -> LoamResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::registry_ops::upsert(conn, entry))
    }

    pub fn remove_registry(
        &self,
        agent_id: &str,
        knowledge_type: KnowledgeType,
        knowledge_id: &str,
    ) -> LoamResult<bool> {
        self.pool.writer.with_conn_sync(|conn| {
            queries::registry_ops::remove(conn, agent_id, knowledge_type, knowledge_id)
        })
    }

    pub fn get_registry(
        &self,
        agent_id: &str,
        knowledge_type: KnowledgeType,
        knowledge_id: &str,
    ) -> LoamResult<Option<RegistryEntry>> {
        self.with_reader(|conn| {
            queries::registry_ops::get(conn, agent_id, knowledge_type, knowledge_id)
        })
    }

    pub fn registry_for_agent(&self, agent_id: &str) -> LoamResult<Vec<RegistryEntry>> {
        self.with_reader(|conn| queries::registry_ops::for_agent(conn, agent_id))
    }

    pub fn list_agents(&self) -> LoamResult<Vec<String>> {
        self.with_reader(queries::registry_ops::list_agents)
    }

    pub fn touch_registry(
        &self,
        agent_id: &str,
        knowledge_type: KnowledgeType,
        knowledge_id: &str,
    ) -> LoamResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            queries::registry_ops::touch(conn, agent_id, knowledge_type, knowledge_id, Utc::now())
        })
    }

    // --- Batch jobs + backups ---

    pub fn insert_job(&self, job: &BatchJob) -> LoamResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::batch_ops::insert_job(conn, job))
    }

    pub fn update_job(&self, job: &BatchJob) -> LoamResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::batch_ops::update_job(conn, job))
    }

    pub fn get_job(&self, job_id: &str) -> LoamResult<Option<BatchJob>> {
        self.with_reader(|conn| queries::batch_ops::get_job(conn, job_id))
    }

    pub fn recent_jobs(&self, limit: usize) -> LoamResult<Vec<BatchJob>> {
        self.with_reader(|conn| queries::batch_ops::recent_jobs(conn, limit))
    }

    pub fn insert_backup(&self, backup: &BackupRecord) -> LoamResult<i64> {
        self.pool
            .writer
            .with_conn_sync(|conn| queries::batch_ops::insert_backup(conn, backup))
    }

    pub fn set_moved_to_id(&self, backup_rowid: i64, moved_to_id: &str) -> LoamResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            queries::batch_ops::set_moved_to_id(conn, backup_rowid, moved_to_id)
        })
    }

    pub fn backups_for_job(&self, job_id: &str) -> LoamResult<Vec<BackupRecord>> {
        self.with_reader(|conn| queries::batch_ops::backups_for_job(conn, job_id))
    }
}
