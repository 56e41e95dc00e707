//! Conversation storage: the collaborator the dispatcher persists messages into.
//!
//! Records are grouped by a logical collection name and keyed by channel id.
//! Backends: in-memory (tests, ephemeral runs), a JSON file per collection, or a remote
//! persistence service over HTTP.

mod file;
mod http;
mod memory;

pub use file::FileStore;
pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::config::{self, Config, StoreBackend};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),
    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("store api error: {0}")]
    Api(String),
}

/// Persists conversation messages. Shared across request tasks, so implementations must be `Send + Sync`.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append one message from `sender` to the conversation `channel` in `collection`.
    async fn add_message(
        &self,
        collection: &str,
        channel: &str,
        sender: &str,
        text: &str,
    ) -> Result<(), StoreError>;

    /// Messages of one conversation, oldest first. Unknown conversations yield an empty list.
    async fn list_messages(
        &self,
        collection: &str,
        channel: &str,
    ) -> Result<Vec<MessageRecord>, StoreError>;
}

/// Collection names end up in file names and URL paths: ASCII letters, digits, `-` and `_` only.
pub(crate) fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let ok = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(collection.to_string()))
    }
}

/// Build the configured backend. `config_path` anchors a relative file-store directory.
pub fn open_store(config: &Config, config_path: &Path) -> anyhow::Result<Arc<dyn ConversationStore>> {
    validate_collection(&config.store.collection)?;
    let store: Arc<dyn ConversationStore> = match config.store.backend {
        StoreBackend::Memory => {
            log::info!("conversation store: in-memory (messages are lost on exit)");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::File => {
            let dir = config::resolve_store_dir(config, config_path);
            log::info!("conversation store: files under {}", dir.display());
            Arc::new(FileStore::new(dir))
        }
        StoreBackend::Http => {
            let url = config::resolve_store_url(config).ok_or_else(|| {
                anyhow::anyhow!("store.backend is \"http\" but no store.url or CHATLOG_STORE_URL is set")
            })?;
            log::info!("conversation store: remote service at {}", url);
            Arc::new(HttpStore::new(url, config::resolve_store_token(config)))
        }
    };
    Ok(store)
}
