use crate::knowledge::KnowledgeType;

/// Storage-layer errors for SQLite operations and knowledge store backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("{knowledge_type} item not found: agent {agent_id}, id {id}")]
    ItemNotFound {
        knowledge_type: KnowledgeType,
        agent_id: String,
        id: String,
    },

    #[error("{knowledge_type} item already exists: agent {agent_id}, id {id}")]
    ItemAlreadyExists {
        knowledge_type: KnowledgeType,
        agent_id: String,
        id: String,
    },

    #[error("backend for {knowledge_type} unavailable: {reason}")]
    BackendUnavailable {
        knowledge_type: KnowledgeType,
        reason: String,
    },

    #[error("invalid value in column {column}: {value}")]
    InvalidColumn { column: String, value: String },

    #[error("storage lock poisoned")]
    LockPoisoned,
}
