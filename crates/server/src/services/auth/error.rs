//! Account error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required registration field is blank.
    #[error("Missing required fields")]
    MissingFields,

    /// Login without an email or password.
    #[error("Email and password required")]
    MissingCredentials,

    /// Invalid email format at registration.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] little_threads_core::EmailError),

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("Account is inactive")]
    AccountInactive,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Phone number already exists")]
    DuplicatePhone,

    /// A uniqueness conflict that names neither email nor phone.
    #[error("User already exists")]
    DuplicateAccount,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
