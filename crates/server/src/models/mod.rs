//! Domain models for the catalog service.

pub mod account;
pub mod product;

pub use account::{AccountAccess, AuthenticatedSession, LoginRecord, NewAccount};
pub use product::{DocumentKind, Product};
