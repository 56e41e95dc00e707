//! File-backed conversation store: one JSON document per collection.
//!
//! `<dir>/<collection>.json` holds `{ "<channel>": [record, ...] }`. Each write reloads the
//! document, appends, and writes it back while holding the store lock.

use super::{validate_collection, ConversationStore, MessageRecord, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type CollectionDoc = BTreeMap<String, Vec<MessageRecord>>;

pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, StoreError> {
        validate_collection(collection)?;
        Ok(self.dir.join(format!("{}.json", collection)))
    }

    /// Load a collection document; a missing file is an empty collection.
    async fn load(path: &Path) -> Result<CollectionDoc, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(s) if s.trim().is_empty() => Ok(CollectionDoc::new()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CollectionDoc::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, path: &Path, doc: &CollectionDoc) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn add_message(
        &self,
        collection: &str,
        channel: &str,
        sender: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        let path = self.collection_path(collection)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = Self::load(&path).await?;
        doc.entry(channel.to_string())
            .or_default()
            .push(MessageRecord::new(sender, text));
        self.save(&path, &doc).await?;
        log::debug!("stored message for {}/{} in {}", collection, channel, path.display());
        Ok(())
    }

    async fn list_messages(
        &self,
        collection: &str,
        channel: &str,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let path = self.collection_path(collection)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = Self::load(&path).await?;
        Ok(doc.remove(channel).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("chatlog-file-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn appends_and_reloads() {
        let dir = temp_dir();
        let store = FileStore::new(&dir);
        store.add_message("conversations", "C1", "User", "hello").await.unwrap();
        store.add_message("conversations", "C1", "User", "again").await.unwrap();
        store.add_message("conversations", "C2", "User", "elsewhere").await.unwrap();

        let reopened = FileStore::new(&dir);
        let c1 = reopened.list_messages("conversations", "C1").await.unwrap();
        assert_eq!(c1.len(), 2);
        assert_eq!(c1[0].text, "hello");
        assert_eq!(c1[1].text, "again");
        assert_eq!(c1[0].sender, "User");
        assert!(dir.join("conversations.json").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let store = FileStore::new(temp_dir());
        assert!(store.list_messages("conversations", "C1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("conversations.json"), "{not json").unwrap();
        let store = FileStore::new(&dir);
        let err = store
            .add_message("conversations", "C1", "User", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn rejects_path_like_collections() {
        let store = FileStore::new(temp_dir());
        let err = store.add_message("../x", "C1", "User", "hi").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(_)));
    }
}
