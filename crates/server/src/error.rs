//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response is JSON: `{"ok": false, "error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AccessError, AuthError, CatalogError};

/// Application-level error type for the catalog service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::Access(access) => access_status(access),
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::Storage(_) | CatalogError::Documents(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::MissingFields
                | AuthError::MissingCredentials
                | AuthError::InvalidEmail(_)
                | AuthError::DuplicateEmail
                | AuthError::DuplicatePhone
                | AuthError::DuplicateAccount => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::AccountInactive => StatusCode::FORBIDDEN,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Catalog(err) => match err {
                CatalogError::Access(AccessError::Repository(_))
                | CatalogError::Storage(_)
                | CatalogError::Documents(_) => INTERNAL_MESSAGE.to_owned(),
                other => other.to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::Repository(_) | AuthError::PasswordHash => INTERNAL_MESSAGE.to_owned(),
                other => other.to_string(),
            },
            Self::BadRequest(message) => message.clone(),
        }
    }
}

const fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AccessError::Forbidden => StatusCode::FORBIDDEN,
        AccessError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = json!({ "ok": false, "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        Self::Catalog(CatalogError::Access(err))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
