//! In-memory conversation store.

use super::{validate_collection, ConversationStore, MessageRecord, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key for one conversation: collection + channel id.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct ConversationKey {
    collection: String,
    channel: String,
}

/// Conversations held in a map; nothing survives the process.
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<ConversationKey, Vec<MessageRecord>>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Total number of stored messages across all collections.
    pub async fn len(&self) -> usize {
        self.inner.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn add_message(
        &self,
        collection: &str,
        channel: &str,
        sender: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let key = ConversationKey {
            collection: collection.to_string(),
            channel: channel.to_string(),
        };
        self.inner
            .write()
            .await
            .entry(key)
            .or_default()
            .push(MessageRecord::new(sender, text));
        Ok(())
    }

    async fn list_messages(
        &self,
        collection: &str,
        channel: &str,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        validate_collection(collection)?;
        let key = ConversationKey {
            collection: collection.to_string(),
            channel: channel.to_string(),
        };
        Ok(self.inner.read().await.get(&key).cloned().unwrap_or_default())
    }
}
