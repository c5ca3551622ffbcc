//! Admin authorization.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use little_threads_core::AccountId;

use crate::db::{AccountStore, RepositoryError};

/// Why a caller was refused.
///
/// A caller id that is malformed, unknown, inactive or not an admin is
/// always `Forbidden`; the response never reveals which.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Unauthorized. Please login.")]
    Unauthenticated,

    #[error("Unauthorized. Admin access required.")]
    Forbidden,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Decides whether a caller may administer the catalog.
#[derive(Clone)]
pub struct AccessGate {
    accounts: Arc<dyn AccountStore>,
}

impl AccessGate {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Whether `caller` is an active, non-deleted admin account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the account store cannot be reached.
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn is_admin(&self, caller: AccountId) -> Result<bool, RepositoryError> {
        let access = self.accounts.find_access(caller).await?;
        Ok(access.is_some_and(|a| a.active && a.access_level.is_admin()))
    }

    /// Resolve the raw caller header into an admin account id.
    ///
    /// # Errors
    ///
    /// `AccessError::Unauthenticated` when no caller was supplied,
    /// `AccessError::Forbidden` when one was supplied but is not an admin.
    pub async fn require_admin(&self, caller: Option<&str>) -> Result<AccountId, AccessError> {
        let raw = caller
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AccessError::Unauthenticated)?;

        let Ok(id) = raw.parse::<AccountId>() else {
            return Err(AccessError::Forbidden);
        };

        if self.is_admin(id).await? {
            Ok(id)
        } else {
            tracing::debug!(caller = %id, "Admin access denied");
            Err(AccessError::Forbidden)
        }
    }
}
