//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! lt-cli admin create -e admin@example.com --first-name Ada --last-name Lovelace -p '...'
//! ```
//!
//! An existing account with the email is promoted to `Admin` and re-activated,
//! keeping its password. Otherwise a new admin account is created.
//!
//! # Environment Variables
//!
//! - `RELATIONAL_*` - Account database settings

use std::sync::Arc;

use little_threads_server::config::{ConfigError, RelationalConfig};
use little_threads_server::credentials::CredentialResolver;
use little_threads_server::db::PgAccountStore;
use little_threads_server::services::{AccountService, AdminGrant, AuthError, Registration};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Account(#[from] AuthError),
}

/// Create an admin account or promote an existing one.
///
/// # Errors
///
/// Returns `AdminError` if configuration is incomplete or the account store
/// rejects the operation.
pub async fn create(
    email: String,
    first_name: String,
    last_name: String,
    password: String,
) -> Result<AdminGrant, AdminError> {
    dotenvy::dotenv().ok();

    let config = RelationalConfig::from_env()?;
    let resolver = Arc::new(CredentialResolver::from_config(&config));
    let service = AccountService::new(Arc::new(PgAccountStore::new(resolver)));

    tracing::info!("Ensuring admin account: {}", email);

    let grant = service
        .ensure_admin(Registration {
            first_name,
            last_name,
            email: email.clone(),
            phone: None,
            password,
        })
        .await?;

    match grant {
        AdminGrant::Promoted(id) => {
            tracing::info!("Existing account promoted to admin. ID: {}, Email: {}", id, email);
        }
        AdminGrant::Created(id) => {
            tracing::info!("Admin account created. ID: {}, Email: {}", id, email);
        }
    }

    Ok(grant)
}
