//! Account repository.
//!
//! Every operation checks a connection out through the credential resolver
//! and returns it when the operation finishes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Connection;

use little_threads_core::{AccessLevel, AccountId, Email};

use super::RepositoryError;
use crate::credentials::CredentialResolver;
use crate::models::{AccountAccess, LoginRecord, NewAccount};

/// Storage for accounts and their credentials.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Active flag and access level of a non-deleted account.
    async fn find_access(&self, id: AccountId) -> Result<Option<AccountAccess>, RepositoryError>;

    /// Create an account and its credential in one transaction.
    ///
    /// Fails with `RepositoryError::UniqueViolation` on a duplicate email or
    /// phone.
    async fn create_account(&self, account: NewAccount) -> Result<AccountId, RepositoryError>;

    /// Account joined with its credential, excluding soft-deleted accounts.
    async fn find_login(&self, email: &Email) -> Result<Option<LoginRecord>, RepositoryError>;

    async fn record_failed_login(&self, id: AccountId) -> Result<(), RepositoryError>;

    /// Reset the failure counter and record a login time.
    ///
    /// The stored time is strictly later than any previously stored one, even
    /// if the clock has not advanced. Returns the time actually stored.
    async fn record_successful_login(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError>;

    /// Grant admin access to a non-deleted account and re-activate it.
    ///
    /// Returns `None` if no such account exists.
    async fn promote_to_admin(&self, email: &Email) -> Result<Option<AccountId>, RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct AccessRow {
    active: bool,
    access_level: AccessLevel,
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: AccountId,
    email: String,
    first_name: String,
    last_name: String,
    access_level: AccessLevel,
    active: bool,
    password_hash: String,
    failed_login_count: i32,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<LoginRow> for LoginRecord {
    type Error = RepositoryError;

    fn try_from(row: LoginRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            access_level: row.access_level,
            active: row.active,
            password_hash: row.password_hash,
            failed_login_count: row.failed_login_count,
            last_login_at: row.last_login_at,
        })
    }
}

/// `PostgreSQL` account store.
pub struct PgAccountStore {
    resolver: Arc<CredentialResolver>,
}

impl PgAccountStore {
    #[must_use]
    pub const fn new(resolver: Arc<CredentialResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_access(&self, id: AccountId) -> Result<Option<AccountAccess>, RepositoryError> {
        let mut ctx = self.resolver.acquire().await?;

        let row = sqlx::query_as::<_, AccessRow>(
            r"
            SELECT active, access_level
            FROM accounts
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .fetch_optional(ctx.connection())
        .await?;

        Ok(row.map(|r| AccountAccess {
            active: r.active,
            access_level: r.access_level,
        }))
    }

    async fn create_account(&self, account: NewAccount) -> Result<AccountId, RepositoryError> {
        let mut ctx = self.resolver.acquire().await?;
        let mut tx = ctx.connection().begin().await?;
        let id = AccountId::generate();

        sqlx::query(
            r"
            INSERT INTO accounts (id, first_name, last_name, email, phone, access_level, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            ",
        )
        .bind(id)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.email.as_str())
        .bind(account.phone.as_deref())
        .bind(account.access_level)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        sqlx::query(
            r"
            INSERT INTO account_credentials (account_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(id)
        .bind(&account.password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(id)
    }

    async fn find_login(&self, email: &Email) -> Result<Option<LoginRecord>, RepositoryError> {
        let mut ctx = self.resolver.acquire().await?;

        let row = sqlx::query_as::<_, LoginRow>(
            r"
            SELECT a.id, a.email, a.first_name, a.last_name, a.access_level, a.active,
                   c.password_hash, c.failed_login_count, c.last_login_at
            FROM accounts a
            JOIN account_credentials c ON c.account_id = a.id
            WHERE a.email = $1 AND a.deleted_at IS NULL
            ",
        )
        .bind(email.as_str())
        .fetch_optional(ctx.connection())
        .await?;

        row.map(LoginRecord::try_from).transpose()
    }

    async fn record_failed_login(&self, id: AccountId) -> Result<(), RepositoryError> {
        let mut ctx = self.resolver.acquire().await?;

        sqlx::query(
            r"
            UPDATE account_credentials
            SET failed_login_count = failed_login_count + 1
            WHERE account_id = $1
            ",
        )
        .bind(id)
        .execute(ctx.connection())
        .await?;

        Ok(())
    }

    async fn record_successful_login(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let mut ctx = self.resolver.acquire().await?;

        // GREATEST skips NULL, so a first login stores `at` unchanged.
        let recorded: Option<DateTime<Utc>> = sqlx::query_scalar(
            r"
            UPDATE account_credentials
            SET failed_login_count = 0,
                last_login_at = GREATEST($2, last_login_at + INTERVAL '1 microsecond')
            WHERE account_id = $1
            RETURNING last_login_at
            ",
        )
        .bind(id)
        .bind(at)
        .fetch_optional(ctx.connection())
        .await?;

        recorded.ok_or(RepositoryError::NotFound)
    }

    async fn promote_to_admin(&self, email: &Email) -> Result<Option<AccountId>, RepositoryError> {
        let mut ctx = self.resolver.acquire().await?;

        let id = sqlx::query_scalar::<_, AccountId>(
            r"
            UPDATE accounts
            SET access_level = $2, active = TRUE, updated_at = now()
            WHERE email = $1 AND deleted_at IS NULL
            RETURNING id
            ",
        )
        .bind(email.as_str())
        .bind(AccessLevel::Admin)
        .fetch_optional(ctx.connection())
        .await?;

        Ok(id)
    }
}
