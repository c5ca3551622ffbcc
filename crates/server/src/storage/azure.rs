//! Azure Blob Storage over its REST API, authorized by a shared access
//! signature.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ObjectStore, StorageError};
use crate::config::BlobConfig;

const API_VERSION: &str = "2021-08-06";

/// Blob container client.
///
/// Public object URLs carry no signature; the SAS token is only appended to
/// the URLs this client sends requests to.
pub struct AzureBlobStore {
    client: reqwest::Client,
    container_url: Url,
    sas_token: SecretString,
}

impl AzureBlobStore {
    /// # Errors
    ///
    /// Returns `StorageError::Url` if the account URL and container name do
    /// not form a valid URL.
    pub fn new(client: reqwest::Client, config: &BlobConfig) -> Result<Self, StorageError> {
        let mut account_url = config.account_url.clone();
        if !account_url.path().ends_with('/') {
            let path = format!("{}/", account_url.path());
            account_url.set_path(&path);
        }
        let container_url = account_url.join(&format!("{}/", config.container))?;

        Ok(Self {
            client,
            container_url,
            sas_token: config.sas_token.clone(),
        })
    }

    fn signed(&self, mut url: Url, extra: Option<&str>) -> Url {
        let sas = self.sas_token.expose_secret();
        let query = match extra {
            Some(extra) => format!("{extra}&{sas}"),
            None => sas.to_owned(),
        };
        url.set_query(Some(&query));
        url
    }

    async fn check(response: reqwest::Response, key: &str) -> Result<(), StorageError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            status,
            key: key.to_owned(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.signed(self.object_url(key)?, None);

        let response = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", API_VERSION)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        Self::check(response, key).await
    }

    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        Ok(self.container_url.join(key)?)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let url = self.signed(self.object_url(key)?, None);

        let response = self
            .client
            .delete(url)
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, key).await
    }

    async fn ensure_container(&self) -> Result<(), StorageError> {
        let url = self.signed(self.container_url.clone(), Some("restype=container"));

        let response = self
            .client
            .put(url)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-public-access", "blob")
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            tracing::debug!("Image container already exists");
            return Ok(());
        }
        Self::check(response, "").await?;
        tracing::info!(container = %self.container_url, "Image container created");
        Ok(())
    }
}
