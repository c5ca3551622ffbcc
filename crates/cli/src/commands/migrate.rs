//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! lt-cli migrate accounts
//! lt-cli migrate documents
//! lt-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `RELATIONAL_*` - Account database settings; the migration connects
//!   through the same credential chain as the server
//! - `DOCUMENT_STORE_URL` - `PostgreSQL` connection string for documents
//!
//! # Migration Files
//!
//! - Accounts: `crates/server/migrations/accounts/`
//! - Documents: `crates/server/migrations/documents/`

use little_threads_server::config::{ConfigError, RelationalConfig};
use little_threads_server::credentials::{CredentialError, CredentialResolver};
use little_threads_server::db::{ACCOUNT_MIGRATIONS, DOCUMENT_MIGRATIONS, create_document_pool};
use secrecy::SecretString;
use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not connect to the account database: {0}")]
    Credential(#[from] CredentialError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrateError),
}

/// Run account database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if configuration is incomplete, no credential
/// provider can connect, or a migration fails.
pub async fn accounts() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let config = RelationalConfig::from_env()?;
    let resolver = CredentialResolver::from_config(&config);

    tracing::info!("Connecting to account database...");
    let pool = resolver.pool().await?;
    if let Some(provider) = resolver.active_provider().await {
        tracing::info!("Authenticated with {provider}");
    }

    tracing::info!("Running account migrations...");
    ACCOUNT_MIGRATIONS.run(&pool).await?;

    tracing::info!("Account migrations complete!");
    Ok(())
}

/// Run document store migrations.
///
/// # Errors
///
/// Returns `MigrationError` if `DOCUMENT_STORE_URL` is missing or a
/// migration fails.
pub async fn documents() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DOCUMENT_STORE_URL")
        .map_err(|_| MigrationError::MissingEnvVar("DOCUMENT_STORE_URL"))?;
    let pool = create_document_pool(&SecretString::from(database_url))?;

    tracing::info!("Running document store migrations...");
    DOCUMENT_MIGRATIONS.run(&pool).await?;

    tracing::info!("Document store migrations complete!");
    Ok(())
}
