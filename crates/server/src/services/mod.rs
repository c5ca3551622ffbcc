//! Business logic services.
//!
//! Services own the rules; stores behind them only move data.

pub mod access;
pub mod auth;
pub mod catalog;
pub mod images;

pub use access::{AccessError, AccessGate};
pub use auth::{AccountService, AdminGrant, AuthError, Registration};
pub use catalog::{
    CatalogError, DeletedProduct, NewProduct, ProductCatalog, ProductFilters, ProductPatch,
};
pub use images::{DeleteOutcome, ImageLifecycleManager, ImageRef, ImageUpload, Replacement};
