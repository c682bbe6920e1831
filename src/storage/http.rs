//! HTTP storage client: the primary upload path.
//!
//! Every upload is a single `POST {endpoint}/upload` authenticated with the
//! bearer token. A file travels as the raw request body with its base name in
//! the `X-Name` header; a directory travels as a JSON manifest listing its
//! immediate entries. The API answers `{"cid": "..."}`.

use super::{Cid, ClientFactory, StorageClient};
use crate::config::StorageCredentials;
use crate::error::UploadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    cid: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntryManifest<'a> {
    entries: &'a [String],
}

/// `reqwest`-backed [`StorageClient`].
pub struct HttpStorageClient {
    client: reqwest::Client,
    upload_url: reqwest::Url,
    token: String,
}

impl HttpStorageClient {
    /// Build a client for `credentials`. Fails on a malformed endpoint.
    pub fn new(credentials: &StorageCredentials, timeout_secs: u64) -> Result<Self, UploadError> {
        let base = credentials.endpoint.trim_end_matches('/');
        let upload_url = reqwest::Url::parse(&format!("{base}/upload"))
            .map_err(|e| UploadError::ClientInit(format!("invalid endpoint '{}': {e}", credentials.endpoint)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| UploadError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            upload_url,
            token: credentials.token.clone(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Cid, UploadError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        parsed
            .cid
            .as_deref()
            .and_then(Cid::new)
            .ok_or_else(|| UploadError::InvalidResponse("response has no CID".into()))
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<Cid, UploadError> {
        debug!("POST {} ({} bytes, name={})", self.upload_url, bytes.len(), name);
        let request = self
            .client
            .post(self.upload_url.clone())
            .header("X-Name", name)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        self.send(request).await
    }

    async fn upload_entries(&self, names: Vec<String>) -> Result<Cid, UploadError> {
        debug!("POST {} (manifest of {} entries)", self.upload_url, names.len());
        let request = self
            .client
            .post(self.upload_url.clone())
            .json(&EntryManifest { entries: &names });
        self.send(request).await
    }
}

/// Builds an [`HttpStorageClient`] per upload.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    pub timeout_secs: u64,
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

impl ClientFactory for HttpClientFactory {
    fn connect(
        &self,
        credentials: &StorageCredentials,
    ) -> Result<Arc<dyn StorageClient>, UploadError> {
        Ok(Arc::new(HttpStorageClient::new(credentials, self.timeout_secs)?))
    }
}
