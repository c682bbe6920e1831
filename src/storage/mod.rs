//! Storage-network clients.
//!
//! Two independent ways to publish to the same network, attempted in fixed
//! order by [`crate::pipeline::upload::UploadCoordinator`]:
//!
//! 1. [`http`] — the library client, built from [`StorageCredentials`].
//! 2. [`cli`]  — the `storacha` command-line tool, run as a subprocess.
//!
//! Both hand back a [`Cid`]; neither inspects the content it publishes.

pub mod cli;
pub mod http;

use crate::config::StorageCredentials;
use crate::error::UploadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use cli::{extract_cid, CliUploader};
pub use http::{HttpClientFactory, HttpStorageClient};

/// A content identifier returned by the storage network. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

impl Cid {
    /// Wrap `raw` after trimming; `None` if nothing is left.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Cid::new(&value).ok_or_else(|| "CID must not be empty".to_string())
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

/// Render the public gateway link for `cid`.
pub fn gateway_url(base: &str, cid: &Cid) -> String {
    format!("{}/{}", base.trim_end_matches('/'), cid)
}

/// The primary (library) upload client.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload a single file's bytes under `name`.
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<Cid, UploadError>;

    /// Upload a directory manifest made of its immediate entry names.
    async fn upload_entries(&self, names: Vec<String>) -> Result<Cid, UploadError>;
}

/// Builds a [`StorageClient`] from credentials at the start of each upload.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, credentials: &StorageCredentials)
        -> Result<Arc<dyn StorageClient>, UploadError>;
}
