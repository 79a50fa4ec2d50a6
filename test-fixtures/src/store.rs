//! In-memory knowledge store double. Deterministic ids, optional write
//! failure injection for audit-on-failure tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;

use loam_core::errors::{LoamError, LoamResult, StorageError};
use loam_core::knowledge::{KnowledgeContent, KnowledgeItem, KnowledgeType};
use loam_core::traits::KnowledgeStore;

/// DashMap-backed store for one knowledge type.
pub struct InMemoryStore {
    knowledge_type: KnowledgeType,
    items: DashMap<(String, String), KnowledgeItem>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new(knowledge_type: KnowledgeType) -> Self {
        Self {
            knowledge_type,
            items: DashMap::new(),
            next_id: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// When set, every mutation fails with BackendUnavailable until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Total items across all agents.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Seed an item directly, bypassing id assignment.
    pub fn seed(&self, item: KnowledgeItem) {
        self.items.insert((item.agent_id.clone(), item.id.clone()), item);
    }

    fn check_writable(&self) -> LoamResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LoamError::Storage(StorageError::BackendUnavailable {
                knowledge_type: self.knowledge_type,
                reason: "injected failure".to_string(),
            }));
        }
        Ok(())
    }

    fn id_prefix(&self) -> &'static str {
        match self.knowledge_type {
            KnowledgeType::Preference => "pref",
            KnowledgeType::Rule => "rule",
            KnowledgeType::Procedure => "proc",
        }
    }
}

impl KnowledgeStore for InMemoryStore {
    fn knowledge_type(&self) -> KnowledgeType {
        self.knowledge_type
    }

    fn create(
        &self,
        agent_id: &str,
        name: &str,
        content: &KnowledgeContent,
    ) -> LoamResult<String> {
        self.check_writable()?;
        let id = format!("{}-{}", self.id_prefix(), self.next_id.fetch_add(1, Ordering::SeqCst));
        let item = KnowledgeItem {
            knowledge_type: self.knowledge_type,
            id: id.clone(),
            name: name.to_string(),
            content: content.clone(),
            agent_id: agent_id.to_string(),
            tenant_id: None,
        };
        self.items.insert((agent_id.to_string(), id.clone()), item);
        Ok(id)
    }

    fn read(&self, agent_id: &str, id: &str) -> LoamResult<Option<KnowledgeItem>> {
        Ok(self
            .items
            .get(&(agent_id.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn update(&self, agent_id: &str, id: &str, content: &KnowledgeContent) -> LoamResult<()> {
        self.check_writable()?;
        let key = (agent_id.to_string(), id.to_string());
        match self.items.get_mut(&key) {
            Some(mut entry) => {
                entry.value_mut().content = content.clone();
                Ok(())
            }
            None => Err(LoamError::Storage(StorageError::ItemNotFound {
                knowledge_type: self.knowledge_type,
                agent_id: agent_id.to_string(),
                id: id.to_string(),
            })),
        }
    }

    fn delete(&self, agent_id: &str, id: &str) -> LoamResult<bool> {
        self.check_writable()?;
        Ok(self
            .items
            .remove(&(agent_id.to_string(), id.to_string()))
            .is_some())
    }

    fn restore(&self, item: &KnowledgeItem) -> LoamResult<()> {
        self.check_writable()?;
        let key = (item.agent_id.clone(), item.id.clone());
        if self.items.contains_key(&key) {
            return Err(LoamError::Storage(StorageError::ItemAlreadyExists {
                knowledge_type: self.knowledge_type,
                agent_id: item.agent_id.clone(),
                id: item.id.clone(),
            }));
        }
        self.items.insert(key, item.clone());
        Ok(())
    }

    fn list(&self, agent_id: &str) -> LoamResult<Vec<KnowledgeItem>> {
        let mut items: Vec<KnowledgeItem> = self
            .items
            .iter()
            .filter(|entry| entry.key().0 == agent_id)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }
}
