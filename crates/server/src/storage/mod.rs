//! Binary object storage for product images.

pub mod azure;
pub mod memory;

pub use azure::AzureBlobStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

/// Errors from the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store returned {status} for {key}: {body}")]
    Status {
        status: u16,
        key: String,
        body: String,
    },

    #[error("invalid object url: {0}")]
    Url(#[from] url::ParseError),
}

/// A key/value store for binary objects with publicly resolvable URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` at `key`, overwriting any existing object.
    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Public URL of the object at `key`. Does not check it exists.
    fn object_url(&self, key: &str) -> Result<Url, StorageError>;

    /// Delete the object at `key`. Deleting a missing object succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Create the backing container if it does not exist.
    async fn ensure_container(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
