//! Integration tests for Little Threads.
//!
//! These run against a deployed catalog service with real stores behind it.
//! In-process router tests live in `crates/server/tests`.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations and create an admin
//! cargo run -p little-threads-cli -- migrate all
//! cargo run -p little-threads-cli -- admin create -e admin@example.com \
//!     --first-name Test --last-name Admin -p '...'
//!
//! # Start the server, then
//! LT_BASE_URL=http://localhost:8000 LT_ADMIN_ID=<uuid> \
//!     cargo test -p little-threads-integration-tests -- --ignored
//! ```

use reqwest::Client;
use uuid::Uuid;

/// Connection details for a running deployment.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    /// Id of an existing admin account, if configured.
    pub admin_id: Option<String>,
}

impl TestContext {
    /// Build from `LT_BASE_URL` (default `http://localhost:8000`) and
    /// `LT_ADMIN_ID`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("LT_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_owned();

        Self {
            client: Client::builder()
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
            admin_id: std::env::var("LT_ADMIN_ID").ok(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The configured admin id.
    ///
    /// # Panics
    ///
    /// Panics if `LT_ADMIN_ID` is not set.
    #[must_use]
    pub fn admin(&self) -> &str {
        self.admin_id
            .as_deref()
            .expect("LT_ADMIN_ID must name an admin account")
    }
}

/// A unique email address so reruns never collide.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}+{}@littlethreads.test", Uuid::new_v4().simple())
}

/// A minimal valid PNG (1x1, transparent).
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];
