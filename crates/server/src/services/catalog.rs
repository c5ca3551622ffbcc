//! Product catalog.
//!
//! Products span two stores: the image in the object store and the document
//! in the document store. There is no transaction across them, so every
//! mutation writes the durable side effect first and the pointer second:
//!
//! - create uploads the image, then writes the document
//! - update uploads any new image, replaces the document, then releases the
//!   superseded image
//! - delete removes the document, then the image
//!
//! A failure between the two steps can leave an unreferenced image behind
//! (logged at `error` on create). It can never leave a document pointing at
//! an image that does not exist.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use little_threads_core::{ImageExtension, ListInput, Price, PriceError, ProductId, UnsupportedExtension};

use super::access::{AccessError, AccessGate};
use super::images::{DeleteOutcome, ImageLifecycleManager, ImageRef, ImageUpload, object_key};
use crate::db::{ArrayField, DocumentQuery, DocumentStore, RepositoryError};
use crate::models::{DocumentKind, Product};
use crate::storage::StorageError;

const EMPTY_REQUIRED_LISTS: &str = "At least one category and age group required";

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("{0}")]
    Validation(String),

    #[error("Product not found")]
    NotFound,

    #[error("image storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("document store failed: {0}")]
    Documents(#[from] RepositoryError),
}

impl From<PriceError> for CatalogError {
    fn from(e: PriceError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<UnsupportedExtension> for CatalogError {
    fn from(e: UnsupportedExtension) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Fields for a new product, as received.
#[derive(Debug, Default)]
pub struct NewProduct {
    pub price: Option<String>,
    pub image: Option<ImageUpload>,
    pub categories: Option<ListInput>,
    pub age_groups: Option<ListInput>,
    pub seasons: Option<ListInput>,
    pub occasions: Option<ListInput>,
}

/// A partial update. Absent fields keep their stored value.
#[derive(Debug, Default)]
pub struct ProductPatch {
    pub price: Option<String>,
    pub image: Option<ImageUpload>,
    pub categories: Option<ListInput>,
    pub age_groups: Option<ListInput>,
    pub seasons: Option<ListInput>,
    pub occasions: Option<ListInput>,
}

/// Optional listing filters. Blank values are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub age_group: Option<String>,
    pub season: Option<String>,
    pub occasion: Option<String>,
}

impl ProductFilters {
    fn to_query(&self) -> DocumentQuery {
        [
            (ArrayField::Categories, &self.category),
            (ArrayField::AgeGroups, &self.age_group),
            (ArrayField::Seasons, &self.season),
            (ArrayField::Occasions, &self.occasion),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (field, v.to_owned()))
        })
        .fold(DocumentQuery::new(DocumentKind::Product), |query, (field, value)| {
            query.array_contains(field, value)
        })
    }
}

/// A deleted product and what happened to its image.
#[derive(Debug)]
pub struct DeletedProduct {
    pub id: ProductId,
    pub image: DeleteOutcome,
}

/// Owns product documents and coordinates their images.
#[derive(Clone)]
pub struct ProductCatalog {
    access: AccessGate,
    images: ImageLifecycleManager,
    documents: Arc<dyn DocumentStore>,
}

impl ProductCatalog {
    #[must_use]
    pub fn new(
        access: AccessGate,
        images: ImageLifecycleManager,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            access,
            images,
            documents,
        }
    }

    /// Create a product. Admin only.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Access` if the caller is not an admin
    /// - `CatalogError::Validation` for a missing image, disallowed extension,
    ///   bad price, or empty categories or age groups
    /// - `CatalogError::Storage` / `CatalogError::Documents` if a store fails
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        caller: Option<&str>,
        input: NewProduct,
    ) -> Result<Product, CatalogError> {
        self.access.require_admin(caller).await?;

        let image = input
            .image
            .ok_or_else(|| CatalogError::Validation("No image file provided".to_owned()))?;
        let extension = image_extension(&image)?;
        let price = Price::parse(input.price.as_deref().unwrap_or_default())?;
        let categories = normalize(input.categories.as_ref());
        let age_groups = normalize(input.age_groups.as_ref());
        if categories.is_empty() || age_groups.is_empty() {
            return Err(CatalogError::Validation(EMPTY_REQUIRED_LISTS.to_owned()));
        }

        let id = ProductId::generate();
        let image_ref = self
            .images
            .store(id, image.content, extension.content_type(), extension)
            .await?;

        let product = Product {
            id,
            price,
            image_url: image_ref.into(),
            categories,
            age_groups,
            seasons: normalize(input.seasons.as_ref()),
            occasions: normalize(input.occasions.as_ref()),
            created_at: Utc::now(),
            updated_at: None,
            kind: DocumentKind::Product,
        };

        let written = match to_document(&product) {
            Ok(body) => {
                self.documents
                    .create(&id.to_string(), DocumentKind::Product, body)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::error!(
                product_id = %id,
                object_key = %object_key(id, extension),
                error = %e,
                "Product image stored but document write failed; image is orphaned"
            );
            return Err(e.into());
        }

        tracing::info!(product_id = %id, "Product created");
        Ok(product)
    }

    /// Products matching every supplied filter, newest first.
    ///
    /// The stream is lazy and runs its query once.
    pub fn list(&self, filters: &ProductFilters) -> BoxStream<'_, Result<Product, CatalogError>> {
        self.documents
            .query(filters.to_query())
            .map(|item| item.and_then(from_document).map_err(CatalogError::from))
            .boxed()
    }

    /// Merge `patch` into a product and persist the whole document. Admin only.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Access` if the caller is not an admin
    /// - `CatalogError::NotFound` if the product does not exist
    /// - `CatalogError::Validation` for invalid fields or an emptied required list
    /// - `CatalogError::Storage` / `CatalogError::Documents` if a store fails
    #[instrument(skip(self, patch), fields(product_id = %product_id))]
    pub async fn update(
        &self,
        caller: Option<&str>,
        product_id: &str,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        self.access.require_admin(caller).await?;
        let mut product = self.load(product_id).await?;

        // Validate everything before touching any store.
        if let Some(price) = &patch.price {
            product.price = Price::parse(price)?;
        }
        for (input, target) in [
            (&patch.categories, &mut product.categories),
            (&patch.age_groups, &mut product.age_groups),
            (&patch.seasons, &mut product.seasons),
            (&patch.occasions, &mut product.occasions),
        ] {
            if let Some(input) = input {
                *target = input.normalize();
            }
        }
        if product.categories.is_empty() || product.age_groups.is_empty() {
            return Err(CatalogError::Validation(EMPTY_REQUIRED_LISTS.to_owned()));
        }
        let upload = match patch.image {
            Some(image) => Some((image_extension(&image)?, image.content)),
            None => None,
        };

        let replacement = match upload {
            Some((extension, content)) => {
                let previous = ImageRef::parse(&product.image_url)
                    .inspect_err(|e| {
                        tracing::warn!(
                            product_id = %product.id,
                            image = %product.image_url,
                            error = %e,
                            "Current image reference is not a URL; it will be left in place"
                        );
                    })
                    .ok();
                let replacement = self
                    .images
                    .replace(product.id, previous, content, extension)
                    .await?;
                product.image_url = replacement.current().to_string();
                Some(replacement)
            }
            None => None,
        };

        product.updated_at = Some(Utc::now());
        let body = to_document(&product)?;
        self.documents
            .replace(&product.id.to_string(), body)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::NotFound,
                other => CatalogError::Documents(other),
            })?;

        if let Some(replacement) = replacement {
            self.images.release(replacement).await;
        }

        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Delete a product, then its image. Admin only.
    ///
    /// Image deletion is best effort; its outcome is reported, not raised.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Access` if the caller is not an admin
    /// - `CatalogError::NotFound` if the product does not exist
    /// - `CatalogError::Documents` if the document store fails
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete(
        &self,
        caller: Option<&str>,
        product_id: &str,
    ) -> Result<DeletedProduct, CatalogError> {
        self.access.require_admin(caller).await?;
        let product = self.load(product_id).await?;

        if !self.documents.delete(&product.id.to_string()).await? {
            return Err(CatalogError::NotFound);
        }

        let image = match ImageRef::parse(&product.image_url) {
            Ok(image) => self.images.delete(&image).await,
            Err(e) => DeleteOutcome::Failed(format!("image reference is not a URL: {e}")),
        };
        if let Some(warning) = image.warning() {
            tracing::warn!(product_id = %product.id, warning, "Product deleted but image was not");
        }

        tracing::info!(product_id = %product.id, "Product deleted");
        Ok(DeletedProduct {
            id: product.id,
            image,
        })
    }

    async fn load(&self, product_id: &str) -> Result<Product, CatalogError> {
        let Ok(id) = product_id.parse::<ProductId>() else {
            return Err(CatalogError::NotFound);
        };
        let body = self
            .documents
            .get(&id.to_string(), DocumentKind::Product)
            .await?
            .ok_or(CatalogError::NotFound)?;
        Ok(from_document(body)?)
    }
}

fn image_extension(image: &ImageUpload) -> Result<ImageExtension, CatalogError> {
    if image.file_name.trim().is_empty() {
        return Err(CatalogError::Validation("No image selected".to_owned()));
    }
    Ok(ImageExtension::from_file_name(&image.file_name)?)
}

fn normalize(input: Option<&ListInput>) -> Vec<String> {
    input.map(ListInput::normalize).unwrap_or_default()
}

fn to_document(product: &Product) -> Result<Value, RepositoryError> {
    serde_json::to_value(product)
        .map_err(|e| RepositoryError::DataCorruption(format!("product does not serialize: {e}")))
}

fn from_document(body: Value) -> Result<Product, RepositoryError> {
    serde_json::from_value(body)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid product document: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_skip_blank_values() {
        let filters = ProductFilters {
            category: Some("Boys".to_owned()),
            age_group: Some("  ".to_owned()),
            season: None,
            occasion: Some(" Party ".to_owned()),
        };
        let query = filters.to_query();
        assert_eq!(
            query,
            DocumentQuery::new(DocumentKind::Product)
                .array_contains(ArrayField::Categories, "Boys")
                .array_contains(ArrayField::Occasions, "Party")
        );
    }

    #[test]
    fn test_image_extension_messages() {
        let blank = ImageUpload {
            file_name: String::new(),
            content: bytes::Bytes::new(),
        };
        let text = ImageUpload {
            file_name: "notes.txt".to_owned(),
            content: bytes::Bytes::new(),
        };

        assert_eq!(
            image_extension(&blank).unwrap_err().to_string(),
            "No image selected"
        );
        assert_eq!(
            image_extension(&text).unwrap_err().to_string(),
            "Invalid file type. Allowed: PNG, JPG, JPEG, GIF, WEBP"
        );
    }
}
