//! Relational store credential resolution.
//!
//! The account database can be reached three ways, tried in this order:
//!
//! 1. The developer's CLI login (`az account get-access-token`)
//! 2. The platform-assigned workload identity (IMDS or App Service endpoint)
//! 3. A static username and password from configuration
//!
//! Identity providers exchange their identity for an access token scoped to
//! the database resource. The token is handed to the driver as the password
//! attribute of the connect options, so it never appears in a connection
//! string or a log line.
//!
//! Falling from an identity provider to the static password is a downgrade
//! and is logged at `warn` with `from`, `to` and `reason` fields. Falling
//! between identity providers is routine and only logged at `debug`.
//!
//! Resolution happens on first use and the resulting pool is shared by every
//! request. Tokens expire while the pool keeps opening connections with the
//! token it was built from, so a pool built from an identity token that
//! refuses a checkout is discarded and the chain is resolved again.

mod driver;
mod providers;

pub use driver::{BuiltinDrivers, DriverCatalog, DriverInfo, DriverVersion, select_driver};
pub use providers::{CliIdentity, StaticPassword, WorkloadIdentity};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::RelationalConfig;

/// Which provider produced the active credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    CliIdentity,
    WorkloadIdentity,
    StaticPassword,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CliIdentity => "cli-identity",
            Self::WorkloadIdentity => "workload-identity",
            Self::StaticPassword => "static-password",
        }
    }

    /// Whether this provider authenticates with an access token.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        !matches!(self, Self::StaticPassword)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential ready to present to the database.
pub enum DbCredential {
    AccessToken {
        username: String,
        token: SecretString,
    },
    Password {
        username: String,
        password: SecretString,
    },
}

impl DbCredential {
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::AccessToken { username, .. } | Self::Password { username, .. } => username,
        }
    }

    /// The value sent as the password attribute.
    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        match self {
            Self::AccessToken { token, .. } => token,
            Self::Password { password, .. } => password,
        }
    }
}

impl fmt::Debug for DbCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::AccessToken { .. } => "AccessToken",
            Self::Password { .. } => "Password",
        };
        f.debug_struct(kind)
            .field("username", &self.username())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A single provider failing to produce a working connection.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("identity command failed: {0}")]
    Command(String),

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed token response: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection rejected: {0}")]
    Connect(String),
}

/// Record of one provider that was tried and failed.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    pub error: String,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Errors from [`CredentialResolver`].
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No installed driver matches the configured family and minimum version.
    #[error("no compatible database driver (need {family} >= {min_version})")]
    NoCompatibleDriver {
        family: String,
        min_version: DriverVersion,
    },

    /// Every provider in the chain failed.
    #[error("no credential provider succeeded ({})", summarize(.attempts))]
    Unavailable { attempts: Vec<ProviderAttempt> },

    /// A connection could not be checked out of the established pool.
    #[error("failed to acquire connection: {0}")]
    Acquire(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn summarize(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_owned();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Produces a credential for the relational store.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fetch a credential. Called at most once per resolution.
    async fn credential(&self) -> Result<DbCredential, ProviderError>;
}

/// Opens a connection pool with a given credential and checks connections
/// out of it.
#[async_trait]
pub trait Connector: Send + Sync {
    type Pool: Clone + Send + Sync;
    type Connection: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self, credential: &DbCredential) -> Result<Self::Pool, Self::Error>;

    async fn acquire(&self, pool: &Self::Pool) -> Result<Self::Connection, Self::Error>;

    /// Whether a failed checkout means the server refused the credential,
    /// as opposed to the pool being busy or the server unreachable.
    fn credential_refused(&self, error: &Self::Error) -> bool;
}

/// Connects to Postgres, setting the credential on the connect options.
#[derive(Debug, Clone)]
pub struct PgConnector {
    host: String,
    port: u16,
    database: String,
    max_connections: u32,
}

impl PgConnector {
    #[must_use]
    pub fn new(config: &RelationalConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            max_connections: 10,
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Pool = PgPool;
    type Connection = PoolConnection<Postgres>;
    type Error = sqlx::Error;

    async fn connect(&self, credential: &DbCredential) -> Result<PgPool, sqlx::Error> {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(credential.username())
            .password(credential.secret().expose_secret());

        // Connect eagerly so a rejected credential fails here and the next
        // provider gets its turn.
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
    }

    async fn acquire(&self, pool: &PgPool) -> Result<PoolConnection<Postgres>, sqlx::Error> {
        pool.acquire().await
    }

    fn credential_refused(&self, error: &sqlx::Error) -> bool {
        // SQLSTATE class 28: invalid authorization specification.
        matches!(error, sqlx::Error::Database(db) if db.code().is_some_and(|c| c.starts_with("28")))
    }
}

/// The driver family and minimum version the resolver insists on.
#[derive(Debug, Clone)]
pub struct DriverRequirement {
    pub family: String,
    pub min_version: DriverVersion,
}

struct Resolved<P> {
    pool: P,
    provider: ProviderKind,
}

/// Resolves and caches a connection pool for the relational store.
pub struct CredentialResolver<C: Connector = PgConnector> {
    providers: Vec<Box<dyn CredentialProvider>>,
    connector: C,
    requirement: DriverRequirement,
    drivers: Box<dyn DriverCatalog>,
    resolved: RwLock<Option<Arc<Resolved<C::Pool>>>>,
}

impl CredentialResolver<PgConnector> {
    /// Build the standard CLI, workload identity, static password chain.
    #[must_use]
    pub fn from_config(config: &RelationalConfig) -> Self {
        let providers: Vec<Box<dyn CredentialProvider>> = vec![
            Box::new(CliIdentity::new(
                config.identity_username.clone(),
                config.token_resource.clone(),
            )),
            Box::new(WorkloadIdentity::new(
                config.identity_endpoint.clone(),
                config.identity_header.clone(),
                config.identity_username.clone(),
                config.token_resource.clone(),
            )),
            Box::new(StaticPassword::new(
                config.username.clone(),
                config.password.clone(),
            )),
        ];

        Self::new(
            PgConnector::new(config),
            providers,
            DriverRequirement {
                family: config.driver.clone(),
                min_version: config.min_driver_version,
            },
        )
    }
}

impl<C: Connector> CredentialResolver<C> {
    #[must_use]
    pub fn new(
        connector: C,
        providers: Vec<Box<dyn CredentialProvider>>,
        requirement: DriverRequirement,
    ) -> Self {
        Self {
            providers,
            connector,
            requirement,
            drivers: Box::new(BuiltinDrivers),
            resolved: RwLock::new(None),
        }
    }

    /// Replace the driver catalog consulted before any provider runs.
    #[must_use]
    pub fn with_driver_catalog(mut self, drivers: impl DriverCatalog + 'static) -> Self {
        self.drivers = Box::new(drivers);
        self
    }

    /// The shared pool, resolving credentials on first call.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NoCompatibleDriver` before trying any
    /// provider if no suitable driver is installed, or
    /// `CredentialError::Unavailable` if every provider fails.
    pub async fn pool(&self) -> Result<C::Pool, CredentialError> {
        Ok(self.resolved().await?.pool.clone())
    }

    /// The provider behind the active pool, if resolution has happened.
    pub async fn active_provider(&self) -> Option<ProviderKind> {
        self.resolved.read().await.as_ref().map(|r| r.provider)
    }

    /// Check out a connection for one relational store operation.
    ///
    /// The connection returns to the pool when the context is dropped,
    /// whatever the outcome of the operation. If the server refuses the
    /// token a pool was built from, the token is presumed expired. The pool
    /// is discarded, the provider chain runs again, and the checkout is
    /// retried once on the new pool.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if no provider can connect or the pool is
    /// exhausted.
    pub async fn acquire(&self) -> Result<ConnectionContext<C::Connection>, CredentialError> {
        let resolved = self.resolved().await?;
        let (conn, provider) = match self.connector.acquire(&resolved.pool).await {
            Ok(conn) => (conn, resolved.provider),
            Err(e) if resolved.provider.is_identity() && self.connector.credential_refused(&e) => {
                tracing::info!(
                    provider = %resolved.provider,
                    error = %e,
                    "Identity connection refused, resolving credentials again"
                );
                let fresh = self.resolve_again(&resolved).await?;
                let conn = self
                    .connector
                    .acquire(&fresh.pool)
                    .await
                    .map_err(|retry| CredentialError::Acquire(Box::new(retry)))?;
                (conn, fresh.provider)
            }
            Err(e) => return Err(CredentialError::Acquire(Box::new(e))),
        };
        Ok(ConnectionContext { conn, provider })
    }

    async fn resolved(&self) -> Result<Arc<Resolved<C::Pool>>, CredentialError> {
        if let Some(current) = self.resolved.read().await.as_ref() {
            return Ok(Arc::clone(current));
        }

        let mut slot = self.resolved.write().await;
        if let Some(current) = slot.as_ref() {
            return Ok(Arc::clone(current));
        }
        let fresh = Arc::new(self.resolve().await?);
        *slot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Replace `stale` with a fresh resolution. Concurrent callers holding
    /// the same stale pool share one re-resolution.
    async fn resolve_again(
        &self,
        stale: &Arc<Resolved<C::Pool>>,
    ) -> Result<Arc<Resolved<C::Pool>>, CredentialError> {
        let mut slot = self.resolved.write().await;
        if let Some(current) = slot.as_ref().filter(|current| !Arc::ptr_eq(current, stale)) {
            return Ok(Arc::clone(current));
        }
        *slot = None;
        let fresh = Arc::new(self.resolve().await?);
        *slot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    async fn resolve(&self) -> Result<Resolved<C::Pool>, CredentialError> {
        let driver = select_driver(
            self.drivers.as_ref(),
            &self.requirement.family,
            self.requirement.min_version,
        )
        .ok_or_else(|| CredentialError::NoCompatibleDriver {
            family: self.requirement.family.clone(),
            min_version: self.requirement.min_version,
        })?;

        let mut attempts: Vec<ProviderAttempt> = Vec::new();

        for provider in &self.providers {
            let kind = provider.kind();
            let outcome = match provider.credential().await {
                Ok(credential) => self
                    .connector
                    .connect(&credential)
                    .await
                    .map_err(|e| ProviderError::Connect(e.to_string())),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(pool) => {
                    let failed_identity = attempts.iter().rev().find(|a| a.provider.is_identity());
                    match failed_identity {
                        Some(identity) if !kind.is_identity() => tracing::warn!(
                            from = %identity.provider,
                            to = %kind,
                            reason = %identity.error,
                            "Relational credential downgraded"
                        ),
                        Some(identity) => tracing::debug!(
                            from = %identity.provider,
                            to = %kind,
                            "Fell back to another identity provider"
                        ),
                        None => {}
                    }
                    tracing::info!(
                        provider = %kind,
                        driver = %driver.name,
                        driver_version = %driver.version,
                        "Relational store connected"
                    );
                    return Ok(Resolved {
                        pool,
                        provider: kind,
                    });
                }
                Err(e) => {
                    tracing::debug!(provider = %kind, error = %e, "Credential provider failed");
                    attempts.push(ProviderAttempt {
                        provider: kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(CredentialError::Unavailable { attempts })
    }
}

/// A pooled connection plus the provider that authenticated it.
#[derive(Debug)]
pub struct ConnectionContext<T = PoolConnection<Postgres>> {
    conn: T,
    provider: ProviderKind,
}

impl<T> ConnectionContext<T> {
    #[must_use]
    pub const fn provider(&self) -> ProviderKind {
        self.provider
    }
}

impl ConnectionContext<PoolConnection<Postgres>> {
    /// The underlying connection, usable as a sqlx executor.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tracing::instrument::WithSubscriber;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use super::*;

    struct FixedProvider {
        kind: ProviderKind,
        result: Result<&'static str, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CredentialProvider for FixedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn credential(&self) -> Result<DbCredential, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Ok(secret) => Ok(DbCredential::Password {
                    username: "app".to_owned(),
                    password: SecretString::from(secret),
                }),
                Err(reason) => Err(ProviderError::NotConfigured(reason.to_owned())),
            }
        }
    }

    /// Refuses the secret `expired` always, and the secret `token` once
    /// `token_expired` is set. Checkouts fail with `Busy` while `busy` is set.
    #[derive(Default)]
    struct FakeConnector {
        token_expired: Arc<AtomicBool>,
        busy: Arc<AtomicBool>,
    }

    impl FakeConnector {
        fn refuses(&self, secret: &str) -> bool {
            secret == "expired" || (secret == "token" && self.token_expired.load(Ordering::SeqCst))
        }
    }

    #[derive(Debug, Error)]
    enum FakeError {
        #[error("token expired")]
        Expired,
        #[error("pool busy")]
        Busy,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Pool = String;
        type Connection = String;
        type Error = FakeError;

        async fn connect(&self, credential: &DbCredential) -> Result<String, FakeError> {
            let secret = credential.secret().expose_secret();
            if self.refuses(secret) {
                return Err(FakeError::Expired);
            }
            Ok(format!("pool:{secret}"))
        }

        async fn acquire(&self, pool: &String) -> Result<String, FakeError> {
            if self.busy.load(Ordering::SeqCst) {
                return Err(FakeError::Busy);
            }
            let secret = pool.trim_start_matches("pool:");
            if self.refuses(secret) {
                return Err(FakeError::Expired);
            }
            Ok(format!("conn:{secret}"))
        }

        fn credential_refused(&self, error: &FakeError) -> bool {
            matches!(error, FakeError::Expired)
        }
    }

    /// Collects every event with its level and formatted fields.
    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<(tracing::Level, HashMap<String, String>)>>>);

    impl CapturedEvents {
        fn at(&self, level: tracing::Level) -> Vec<HashMap<String, String>> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, fields)| fields.clone())
                .collect()
        }
    }

    #[derive(Default)]
    struct FieldMap(HashMap<String, String>);

    impl tracing::field::Visit for FieldMap {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_owned(), format!("{value:?}"));
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CapturedEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = FieldMap::default();
            event.record(&mut fields);
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), fields.0));
        }
    }

    struct NoDrivers;

    impl DriverCatalog for NoDrivers {
        fn installed(&self) -> Vec<DriverInfo> {
            Vec::new()
        }
    }

    fn provider(
        kind: ProviderKind,
        result: Result<&'static str, &'static str>,
        calls: &Arc<AtomicUsize>,
    ) -> Box<dyn CredentialProvider> {
        Box::new(FixedProvider {
            kind,
            result,
            calls: Arc::clone(calls),
        })
    }

    fn requirement() -> DriverRequirement {
        DriverRequirement {
            family: "postgres".to_owned(),
            min_version: DriverVersion::new(3, 0),
        }
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![
                provider(ProviderKind::CliIdentity, Ok("token-a"), &calls),
                provider(ProviderKind::StaticPassword, Ok("pw"), &calls),
            ],
            requirement(),
        );

        assert_eq!(resolver.pool().await.unwrap(), "pool:token-a");
        assert_eq!(resolver.active_provider().await, Some(ProviderKind::CliIdentity));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_static_when_token_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![
                provider(ProviderKind::CliIdentity, Err("az not installed"), &calls),
                provider(ProviderKind::WorkloadIdentity, Ok("expired"), &calls),
                provider(ProviderKind::StaticPassword, Ok("pw"), &calls),
            ],
            requirement(),
        );

        assert_eq!(resolver.pool().await.unwrap(), "pool:pw");
        assert_eq!(resolver.active_provider().await, Some(ProviderKind::StaticPassword));
    }

    #[tokio::test]
    async fn test_downgrade_to_static_is_logged_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![
                provider(ProviderKind::CliIdentity, Err("az not installed"), &calls),
                provider(ProviderKind::WorkloadIdentity, Ok("expired"), &calls),
                provider(ProviderKind::StaticPassword, Ok("pw"), &calls),
            ],
            requirement(),
        );
        let events = CapturedEvents::default();

        resolver
            .pool()
            .with_subscriber(tracing_subscriber::registry().with(events.clone()))
            .await
            .unwrap();

        let warnings = events.at(tracing::Level::WARN);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        let warning = &warnings[0];
        assert_eq!(warning["message"], "Relational credential downgraded");
        assert_eq!(warning["from"], "workload-identity");
        assert_eq!(warning["to"], "static-password");
        assert!(warning["reason"].contains("token expired"));
    }

    #[tokio::test]
    async fn test_fallback_between_identities_is_not_a_downgrade() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![
                provider(ProviderKind::CliIdentity, Err("az not installed"), &calls),
                provider(ProviderKind::WorkloadIdentity, Ok("token-w"), &calls),
                provider(ProviderKind::StaticPassword, Ok("pw"), &calls),
            ],
            requirement(),
        );
        let events = CapturedEvents::default();

        resolver
            .pool()
            .with_subscriber(tracing_subscriber::registry().with(events.clone()))
            .await
            .unwrap();

        assert!(events.at(tracing::Level::WARN).is_empty());
        assert_eq!(
            resolver.active_provider().await,
            Some(ProviderKind::WorkloadIdentity)
        );
    }

    #[tokio::test]
    async fn test_expired_token_resolves_again_on_checkout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let connector = FakeConnector::default();
        let token_expired = Arc::clone(&connector.token_expired);
        let resolver = CredentialResolver::new(
            connector,
            vec![
                provider(ProviderKind::CliIdentity, Ok("token"), &calls),
                provider(ProviderKind::StaticPassword, Ok("pw"), &calls),
            ],
            requirement(),
        );

        let ctx = resolver.acquire().await.unwrap();
        assert_eq!(ctx.provider(), ProviderKind::CliIdentity);
        assert_eq!(ctx.conn, "conn:token");

        token_expired.store(true, Ordering::SeqCst);

        let ctx = resolver.acquire().await.unwrap();
        assert_eq!(ctx.provider(), ProviderKind::StaticPassword);
        assert_eq!(ctx.conn, "conn:pw");
        assert_eq!(resolver.active_provider().await, Some(ProviderKind::StaticPassword));
        assert_eq!(resolver.pool().await.unwrap(), "pool:pw");
        // CLI tried twice, static once.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_busy_pool_is_not_resolved_again() {
        let calls = Arc::new(AtomicUsize::new(0));
        let connector = FakeConnector::default();
        let busy = Arc::clone(&connector.busy);
        let resolver = CredentialResolver::new(
            connector,
            vec![
                provider(ProviderKind::CliIdentity, Ok("token"), &calls),
                provider(ProviderKind::StaticPassword, Ok("pw"), &calls),
            ],
            requirement(),
        );
        resolver.acquire().await.unwrap();

        busy.store(true, Ordering::SeqCst);
        let err = resolver.acquire().await.unwrap_err();
        assert!(matches!(err, CredentialError::Acquire(_)));
        assert_eq!(resolver.active_provider().await, Some(ProviderKind::CliIdentity));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![provider(ProviderKind::StaticPassword, Ok("pw"), &calls)],
            requirement(),
        );

        resolver.pool().await.unwrap();
        resolver.pool().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_lists_every_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![
                provider(ProviderKind::CliIdentity, Ok("expired"), &calls),
                provider(ProviderKind::StaticPassword, Err("no password"), &calls),
            ],
            requirement(),
        );

        let err = resolver.pool().await.unwrap_err();
        match &err {
            CredentialError::Unavailable { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].provider, ProviderKind::CliIdentity);
                assert_eq!(attempts[1].provider, ProviderKind::StaticPassword);
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert!(err.to_string().contains("token expired"));
        assert!(resolver.active_provider().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_driver_is_fatal_before_providers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CredentialResolver::new(
            FakeConnector::default(),
            vec![provider(ProviderKind::StaticPassword, Ok("pw"), &calls)],
            requirement(),
        )
        .with_driver_catalog(NoDrivers);

        let err = resolver.pool().await.unwrap_err();
        assert!(matches!(err, CredentialError::NoCompatibleDriver { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_credential_debug_redacts() {
        let credential = DbCredential::AccessToken {
            username: "catalog-identity".to_owned(),
            token: SecretString::from("eyJ0eXAiOi"),
        };
        let debug_output = format!("{credential:?}");
        assert!(debug_output.contains("catalog-identity"));
        assert!(!debug_output.contains("eyJ0eXAiOi"));
    }
}
