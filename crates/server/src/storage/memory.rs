//! In-memory object store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use url::Url;

use super::{ObjectStore, StorageError};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Bytes,
    pub content_type: String,
}

/// Objects held in memory, served under a fixed base URL.
pub struct MemoryObjectStore {
    base_url: Url,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    /// # Errors
    ///
    /// Returns `StorageError::Url` if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, StorageError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            objects: RwLock::new(HashMap::new()),
        })
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects.write().await.insert(
            key.to_owned(),
            StoredObject {
                content,
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        Ok(self.base_url.join(key)?)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
