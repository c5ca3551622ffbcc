//! Concrete credential providers.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{CredentialProvider, DbCredential, ProviderError, ProviderKind};

const CLI_TIMEOUT: Duration = Duration::from_secs(30);
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(5);

/// API version understood by the instance metadata endpoint.
const IMDS_API_VERSION: &str = "2018-02-01";
/// API version understood by platform-provided identity endpoints.
const PLATFORM_API_VERSION: &str = "2019-08-01";

/// Access token from the locally logged-in CLI.
pub struct CliIdentity {
    program: String,
    username: String,
    resource: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
}

impl CliIdentity {
    #[must_use]
    pub fn new(username: String, resource: String) -> Self {
        Self {
            program: "az".to_owned(),
            username,
            resource,
        }
    }
}

#[async_trait]
impl CredentialProvider for CliIdentity {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CliIdentity
    }

    async fn credential(&self) -> Result<DbCredential, ProviderError> {
        let command = tokio::process::Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                &self.resource,
                "--output",
                "json",
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(CLI_TIMEOUT, command)
            .await
            .map_err(|_| ProviderError::Timeout(CLI_TIMEOUT))?
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    ProviderError::NotConfigured(format!("{} is not installed", self.program))
                }
                _ => ProviderError::Command(e.to_string()),
            })?;

        if !output.status.success() {
            return Err(ProviderError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let token: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(DbCredential::AccessToken {
            username: self.username.clone(),
            token: SecretString::from(token.access_token),
        })
    }
}

/// Access token from the platform's managed identity endpoint.
///
/// With an identity header configured, the endpoint is treated as an App
/// Service style endpoint; otherwise it is the instance metadata service.
pub struct WorkloadIdentity {
    client: reqwest::Client,
    endpoint: Url,
    header: Option<SecretString>,
    username: String,
    resource: String,
}

#[derive(Deserialize)]
struct IdentityToken {
    access_token: String,
}

impl WorkloadIdentity {
    #[must_use]
    pub fn new(
        endpoint: Url,
        header: Option<SecretString>,
        username: String,
        resource: String,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(IDENTITY_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint,
            header,
            username,
            resource,
        }
    }

    fn token_url(&self) -> Url {
        let api_version = if self.header.is_some() {
            PLATFORM_API_VERSION
        } else {
            IMDS_API_VERSION
        };
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("api-version", api_version)
            .append_pair("resource", &self.resource);
        url
    }
}

#[async_trait]
impl CredentialProvider for WorkloadIdentity {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WorkloadIdentity
    }

    async fn credential(&self) -> Result<DbCredential, ProviderError> {
        let request = self.client.get(self.token_url());
        let request = match &self.header {
            Some(secret) => request.header("X-IDENTITY-HEADER", secret.expose_secret()),
            None => request.header("Metadata", "true"),
        };

        let token: IdentityToken = request
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(IDENTITY_TIMEOUT)
                } else {
                    ProviderError::Http(e)
                }
            })?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(DbCredential::AccessToken {
            username: self.username.clone(),
            token: SecretString::from(token.access_token),
        })
    }
}

/// Username and password from configuration. Always last in the chain.
pub struct StaticPassword {
    username: String,
    password: Option<SecretString>,
}

impl StaticPassword {
    #[must_use]
    pub const fn new(username: String, password: Option<SecretString>) -> Self {
        Self { username, password }
    }
}

#[async_trait]
impl CredentialProvider for StaticPassword {
    fn kind(&self) -> ProviderKind {
        ProviderKind::StaticPassword
    }

    async fn credential(&self) -> Result<DbCredential, ProviderError> {
        let password = self
            .password
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("no static password set".to_owned()))?;

        Ok(DbCredential::Password {
            username: self.username.clone(),
            password,
        })
    }
}
