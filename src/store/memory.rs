use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::models::StoredEntry;

// Process-local store, for running without Firestore and for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    // snapshot in insertion order
    pub async fn entries(&self) -> Vec<StoredEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn latest(&self) -> Result<Option<StoredEntry>, StoreError> {
        let entries = self.entries.read().await;
        // ties go to the later insert
        let newest = entries
            .iter()
            .enumerate()
            .max_by_key(|(i, e)| (e.timestamp, *i))
            .map(|(_, e)| e.clone());
        Ok(newest)
    }

    async fn append(&self, entry: StoredEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
