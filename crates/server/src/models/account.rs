//! Account and credential records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use little_threads_core::{AccessLevel, AccountId, Email};

/// Input for creating an account together with its credential.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub access_level: AccessLevel,
    pub password_hash: String,
}

/// What the access gate needs to know about a non-deleted account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountAccess {
    pub active: bool,
    pub access_level: AccessLevel,
}

/// Account joined with its credential, looked up by email for login.
#[derive(Debug, Clone)]
pub struct LoginRecord {
    pub id: AccountId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub access_level: AccessLevel,
    pub active: bool,
    pub password_hash: String,
    pub failed_login_count: i32,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Returned to the client after a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedSession {
    pub user_id: AccountId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub access_level: AccessLevel,
}
