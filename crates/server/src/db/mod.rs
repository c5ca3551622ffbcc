//! Persistence for accounts (relational store) and product documents
//! (document store).
//!
//! # Databases
//!
//! - Accounts: `accounts` and `account_credentials`, reached through
//!   [`CredentialResolver`](crate::credentials::CredentialResolver)
//! - Documents: a single `documents` table with JSONB bodies
//!
//! # Migrations
//!
//! Stored in `crates/server/migrations/{accounts,documents}` and run via:
//! ```bash
//! cargo run -p little-threads-cli -- migrate
//! ```

pub mod accounts;
pub mod documents;
pub mod memory;

pub use accounts::{AccountStore, PgAccountStore};
pub use documents::{
    ArrayField, DocumentFilter, DocumentQuery, DocumentStore, DocumentStream, PgDocumentStore,
};
pub use memory::{MemoryAccountStore, MemoryDocumentStore};

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use crate::credentials::CredentialError;

/// Schema for the account database.
pub static ACCOUNT_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/accounts");

/// Schema for the document store.
pub static DOCUMENT_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/documents");

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("connection unavailable: {0}")]
    Connection(#[from] CredentialError),

    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// A unique constraint fired. `constraint` is the name reported by the
    /// database, when it reports one.
    #[error("unique constraint violated: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },
}

impl RepositoryError {
    /// Convert a sqlx error, recognising unique violations.
    pub(crate) fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::UniqueViolation {
                constraint: db_err.constraint().map(str::to_owned),
                message: db_err.message().to_owned(),
            };
        }
        Self::Database(e)
    }
}

/// Create a lazily connecting `PostgreSQL` pool for the document store.
///
/// No connection is opened until the first query.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_document_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    let options: PgConnectOptions = database_url.expose_secret().parse()?;
    Ok(PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options))
}
