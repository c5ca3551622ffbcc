//! Product image lifecycle.
//!
//! Images live at `products/{product_id}.{ext}` in the object store. Every
//! reference handed out carries a `v` query parameter minted from the current
//! time, so clients that cache by URL see replaced images.
//!
//! This module only talks to the object store. Keeping product documents in
//! step with the images is the catalog's job.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::instrument;
use url::Url;

use little_threads_core::{ImageExtension, ProductId};

use crate::storage::{ObjectStore, StorageError};

/// An uploaded image file as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content: Bytes,
}

/// A public, cache-busted image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(Url);

impl ImageRef {
    /// # Errors
    ///
    /// Returns `url::ParseError` if `value` is not an absolute URL.
    pub fn parse(value: &str) -> Result<Self, url::ParseError> {
        Url::parse(value).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Extension of the referenced object, if it is an allowed one.
    #[must_use]
    pub fn extension(&self) -> Option<ImageExtension> {
        let name = self.0.path_segments()?.next_back()?;
        ImageExtension::from_file_name(name).ok()
    }

    /// The URL without its version token.
    fn unversioned(&self) -> Url {
        let mut url = self.0.clone();
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<ImageRef> for String {
    fn from(image: ImageRef) -> Self {
        image.0.into()
    }
}

/// Result of a best-effort image deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The image could not be deleted. The caller's operation still succeeds.
    Failed(String),
}

impl DeleteOutcome {
    /// Warning text for the caller, if deletion failed.
    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Deleted => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// A newly stored image whose predecessor is still in place.
///
/// Hand it to [`ImageLifecycleManager::release`] once nothing points at the
/// old image. Dropping it instead leaves the old image in the store.
#[derive(Debug)]
#[must_use = "the superseded image is only deleted by `release`"]
pub struct Replacement {
    current: ImageRef,
    superseded: Option<ImageRef>,
}

impl Replacement {
    /// Reference to the new image.
    #[must_use]
    pub const fn current(&self) -> &ImageRef {
        &self.current
    }
}

/// Object key for a product's image.
#[must_use]
pub fn object_key(product_id: ProductId, extension: ImageExtension) -> String {
    format!("products/{product_id}.{extension}")
}

/// Uploads, replaces and deletes product images.
#[derive(Clone)]
pub struct ImageLifecycleManager {
    objects: Arc<dyn ObjectStore>,
}

impl ImageLifecycleManager {
    #[must_use]
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Upload an image for a product, overwriting any object at the same key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the upload fails.
    #[instrument(skip(self, content), fields(product_id = %product_id, extension = %extension, bytes = content.len()))]
    pub async fn store(
        &self,
        product_id: ProductId,
        content: Bytes,
        content_type: &str,
        extension: ImageExtension,
    ) -> Result<ImageRef, StorageError> {
        let key = object_key(product_id, extension);
        self.objects.put_object(&key, content, content_type).await?;
        self.versioned(&key)
    }

    /// Upload a new image for a product in place of `old`.
    ///
    /// The old image is untouched until the returned [`Replacement`] is
    /// released. A new image with the same extension has already overwritten
    /// it, so releasing then deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the new upload fails. The old image is then
    /// left untouched.
    pub async fn replace(
        &self,
        product_id: ProductId,
        old: Option<ImageRef>,
        content: Bytes,
        extension: ImageExtension,
    ) -> Result<Replacement, StorageError> {
        let current = self
            .store(product_id, content, extension.content_type(), extension)
            .await?;
        let superseded = old.filter(|old| old.unversioned() != current.unversioned());
        Ok(Replacement {
            current,
            superseded,
        })
    }

    /// Delete the image a [`Replacement`] superseded, if it lives at a
    /// different key. Failure is logged and otherwise ignored.
    pub async fn release(&self, replacement: Replacement) -> ImageRef {
        let Replacement {
            current,
            superseded,
        } = replacement;
        if let Some(old) = superseded
            && let DeleteOutcome::Failed(reason) = self.delete(&old).await
        {
            tracing::warn!(image = %old, reason = %reason, "Superseded image left in place");
        }
        current
    }

    /// Best-effort deletion of a referenced image.
    #[instrument(skip(self), fields(image = %image))]
    pub async fn delete(&self, image: &ImageRef) -> DeleteOutcome {
        let Some(key) = self.key_of(image) else {
            let reason = "image is not in the product image store".to_owned();
            tracing::warn!(image = %image, "{reason}");
            return DeleteOutcome::Failed(reason);
        };

        match self.objects.delete_object(&key).await {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) => {
                tracing::warn!(object_key = %key, error = %e, "Image deletion failed");
                DeleteOutcome::Failed(format!("image could not be deleted: {e}"))
            }
        }
    }

    /// Object key behind a reference, if it points into this store.
    fn key_of(&self, image: &ImageRef) -> Option<String> {
        let base = self.objects.object_url("").ok()?;
        let url = image.unversioned();
        url.as_str()
            .strip_prefix(base.as_str())
            .filter(|key| !key.is_empty())
            .map(str::to_owned)
    }

    fn versioned(&self, key: &str) -> Result<ImageRef, StorageError> {
        let mut url = self.objects.object_url(key)?;
        url.query_pairs_mut()
            .append_pair("v", &Utc::now().timestamp_millis().to_string());
        Ok(ImageRef(url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::storage::MemoryObjectStore;

    const BASE: &str = "http://127.0.0.1:10000/product-images/";

    fn manager() -> (Arc<MemoryObjectStore>, ImageLifecycleManager) {
        let store = Arc::new(MemoryObjectStore::new(BASE).unwrap());
        let manager = ImageLifecycleManager::new(store.clone());
        (store, manager)
    }

    /// Stores objects but refuses to delete them.
    struct UndeletableStore(MemoryObjectStore);

    #[async_trait]
    impl ObjectStore for UndeletableStore {
        async fn put_object(
            &self,
            key: &str,
            content: Bytes,
            content_type: &str,
        ) -> Result<(), StorageError> {
            self.0.put_object(key, content, content_type).await
        }

        fn object_url(&self, key: &str) -> Result<Url, StorageError> {
            self.0.object_url(key)
        }

        async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
            Err(StorageError::Status {
                status: 403,
                key: key.to_owned(),
                body: "AuthorizationFailure".to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn test_store_returns_versioned_reference() {
        let (store, manager) = manager();
        let id = ProductId::generate();

        let image = manager
            .store(id, Bytes::from_static(b"png"), "image/png", ImageExtension::Png)
            .await
            .unwrap();

        let prefix = format!("{BASE}products/{id}.png?v=");
        assert!(image.as_str().starts_with(&prefix), "{image}");
        assert_eq!(image.extension(), Some(ImageExtension::Png));
        let stored = store.get(&format!("products/{id}.png")).await.unwrap();
        assert_eq!(stored.content, Bytes::from_static(b"png"));
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_replace_same_extension_overwrites() {
        let (store, manager) = manager();
        let id = ProductId::generate();
        let old = manager
            .store(id, Bytes::from_static(b"v1"), "image/png", ImageExtension::Png)
            .await
            .unwrap();

        let replacement = manager
            .replace(id, Some(old), Bytes::from_static(b"v2"), ImageExtension::Png)
            .await
            .unwrap();
        manager.release(replacement).await;

        assert_eq!(store.keys().await, vec![format!("products/{id}.png")]);
        let stored = store.get(&format!("products/{id}.png")).await.unwrap();
        assert_eq!(stored.content, Bytes::from_static(b"v2"));
    }

    #[tokio::test]
    async fn test_replace_new_extension_removes_old() {
        let (store, manager) = manager();
        let id = ProductId::generate();
        let old = manager
            .store(id, Bytes::from_static(b"v1"), "image/png", ImageExtension::Png)
            .await
            .unwrap();

        let replacement = manager
            .replace(id, Some(old), Bytes::from_static(b"v2"), ImageExtension::Webp)
            .await
            .unwrap();
        // Both exist until the replacement is released.
        assert_eq!(store.keys().await.len(), 2);

        let new = manager.release(replacement).await;
        assert_eq!(new.extension(), Some(ImageExtension::Webp));
        assert_eq!(store.keys().await, vec![format!("products/{id}.webp")]);
    }

    #[tokio::test]
    async fn test_replace_keeps_new_image_when_delete_fails() {
        let store = Arc::new(UndeletableStore(MemoryObjectStore::new(BASE).unwrap()));
        let manager = ImageLifecycleManager::new(store.clone());
        let id = ProductId::generate();
        let old = manager
            .store(id, Bytes::from_static(b"v1"), "image/gif", ImageExtension::Gif)
            .await
            .unwrap();

        let replacement = manager
            .replace(id, Some(old), Bytes::from_static(b"v2"), ImageExtension::Jpeg)
            .await
            .unwrap();
        let new = manager.release(replacement).await;

        assert_eq!(new.extension(), Some(ImageExtension::Jpeg));
        assert_eq!(store.0.keys().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_reports_failure_as_outcome() {
        let store = Arc::new(UndeletableStore(MemoryObjectStore::new(BASE).unwrap()));
        let manager = ImageLifecycleManager::new(store);
        let image = manager
            .store(
                ProductId::generate(),
                Bytes::from_static(b"x"),
                "image/png",
                ImageExtension::Png,
            )
            .await
            .unwrap();

        let outcome = manager.delete(&image).await;
        assert!(matches!(outcome, DeleteOutcome::Failed(_)));
        assert!(outcome.warning().is_some());
    }

    #[tokio::test]
    async fn test_delete_foreign_reference_is_not_attempted() {
        let (store, manager) = manager();
        let id = ProductId::generate();
        manager
            .store(id, Bytes::from_static(b"x"), "image/png", ImageExtension::Png)
            .await
            .unwrap();

        let foreign = ImageRef::parse("https://cdn.example.com/products/x.png?v=1").unwrap();
        assert!(matches!(
            manager.delete(&foreign).await,
            DeleteOutcome::Failed(_)
        ));
        assert_eq!(store.keys().await.len(), 1);
    }
}
