//! Product documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use little_threads_core::{Price, ProductId};

/// Discriminator stored in every document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Product,
}

impl DocumentKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
        }
    }
}

/// A catalog product as stored in the document store and returned to clients.
///
/// `categories` and `age_groups` are never empty once persisted; `seasons`
/// and `occasions` may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub price: Price,
    /// Public image URL carrying a `v` cache-busting parameter.
    pub image_url: String,
    pub categories: Vec<String>,
    pub age_groups: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<String>,
    #[serde(default)]
    pub occasions: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub kind: DocumentKind,
}
