use crate::errors::LoamResult;
use crate::knowledge::{KnowledgeContent, KnowledgeItem, KnowledgeType};

/// Physical backend for one knowledge type.
///
/// Implementations own id assignment on `create`. All operations are scoped
/// to a single agent; cross-agent access never goes through a store.
pub trait KnowledgeStore: Send + Sync {
    /// The single knowledge type this store holds.
    fn knowledge_type(&self) -> KnowledgeType;

    /// Insert new content and return the backend-assigned id.
    fn create(&self, agent_id: &str, name: &str, content: &KnowledgeContent)
        -> LoamResult<String>;

    fn read(&self, agent_id: &str, id: &str) -> LoamResult<Option<KnowledgeItem>>;

    /// Overwrite the content of an existing item.
    fn update(&self, agent_id: &str, id: &str, content: &KnowledgeContent) -> LoamResult<()>;

    /// Remove an item. Returns false when it was already gone; deleting a
    /// missing item is not an error.
    fn delete(&self, agent_id: &str, id: &str) -> LoamResult<bool>;

    /// Re-insert a previously deleted item under its original id. Used only
    /// by rollback.
    fn restore(&self, item: &KnowledgeItem) -> LoamResult<()>;

    /// All items for one agent.
    fn list(&self, agent_id: &str) -> LoamResult<Vec<KnowledgeItem>>;
}
