//! Account service.
//!
//! Password registration and login against the account store.

mod error;

pub use error::AuthError;

use std::fmt;
use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use little_threads_core::{AccessLevel, AccountId, Email};

use crate::db::{AccountStore, RepositoryError};
use crate::models::{AuthenticatedSession, NewAccount};

/// Hash checked against when the email is unknown, so that path costs the
/// same as a wrong password.
static UNKNOWN_ACCOUNT_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no account has this password").ok());

/// Registration request.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Result of [`AccountService::ensure_admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminGrant {
    /// An existing account was promoted and re-activated.
    Promoted(AccountId),
    /// No account existed, so a new admin account was created.
    Created(AccountId),
}

/// Account registration and login.
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Register a standard account.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingFields` if a name, the email or the password is blank
    /// - `AuthError::InvalidEmail` if the email is malformed
    /// - `AuthError::DuplicateEmail`, `DuplicatePhone` or `DuplicateAccount`
    ///   on a uniqueness conflict
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<AccountId, AuthError> {
        let account = new_account(registration, AccessLevel::Standard)?;
        let id = self.create(account).await?;
        tracing::info!(account_id = %id, "Account registered");
        Ok(id)
    }

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingCredentials` if either value is blank
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password
    /// - `AuthError::AccountInactive` if the account is deactivated
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some(record) = self.accounts.find_login(&email).await? else {
            if let Some(hash) = UNKNOWN_ACCOUNT_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !record.active {
            return Err(AuthError::AccountInactive);
        }

        if let Err(e) = verify_password(password, &record.password_hash) {
            self.accounts.record_failed_login(record.id).await?;
            tracing::info!(
                account_id = %record.id,
                failed_logins = record.failed_login_count + 1,
                "Login failed"
            );
            return Err(e);
        }

        self.accounts
            .record_successful_login(record.id, Utc::now())
            .await?;

        Ok(AuthenticatedSession {
            user_id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            access_level: record.access_level,
        })
    }

    /// Make sure an admin account exists for `registration.email`.
    ///
    /// An existing account is promoted and re-activated, keeping its password.
    /// Otherwise a new admin account is created from `registration`.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register) when an account has to be created.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn ensure_admin(&self, registration: Registration) -> Result<AdminGrant, AuthError> {
        let email = Email::parse(&registration.email)?;
        if let Some(id) = self.accounts.promote_to_admin(&email).await? {
            tracing::info!(account_id = %id, "Existing account promoted to admin");
            return Ok(AdminGrant::Promoted(id));
        }

        let account = new_account(registration, AccessLevel::Admin)?;
        let id = self.create(account).await?;
        tracing::info!(account_id = %id, "Admin account created");
        Ok(AdminGrant::Created(id))
    }

    async fn create(&self, account: NewAccount) -> Result<AccountId, AuthError> {
        self.accounts
            .create_account(account)
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueViolation {
                    constraint,
                    message,
                } => classify_conflict(constraint.as_deref(), &message),
                other => AuthError::Repository(other),
            })
    }
}

fn new_account(registration: Registration, level: AccessLevel) -> Result<NewAccount, AuthError> {
    let first_name = registration.first_name.trim();
    let last_name = registration.last_name.trim();
    if first_name.is_empty()
        || last_name.is_empty()
        || registration.email.trim().is_empty()
        || registration.password.is_empty()
    {
        return Err(AuthError::MissingFields);
    }

    let email = Email::parse(&registration.email)?;
    let phone = registration
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned);
    let password_hash = hash_password(&registration.password)?;

    Ok(NewAccount {
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email,
        phone,
        access_level: level,
        password_hash,
    })
}

/// Decide which unique constraint a violation came from.
///
/// The constraint name wins when the database reports one. Otherwise the
/// message text is searched, checking for "email" before "phone".
fn classify_conflict(constraint: Option<&str>, message: &str) -> AuthError {
    match constraint {
        Some("accounts_email_key") => return AuthError::DuplicateEmail,
        Some("accounts_phone_key") => return AuthError::DuplicatePhone,
        _ => {}
    }

    let text = format!("{} {message}", constraint.unwrap_or_default()).to_lowercase();
    if text.contains("email") {
        AuthError::DuplicateEmail
    } else if text.contains("phone") {
        AuthError::DuplicatePhone
    } else {
        AuthError::DuplicateAccount
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
