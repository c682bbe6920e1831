//! Upload stage: primary client, then CLI fallback.
//!
//! ## Protocol
//!
//! Two states, each attempted once, in order:
//!
//! 1. **Primary** — build a [`StorageClient`] from the credentials. A
//!    directory is published as a manifest of its immediate entry names (no
//!    recursive walk); a file is published as its bytes under its base name.
//! 2. **Fallback** — run `<cli> up <path>` and scrape the CID from stdout.
//!
//! Any primary failure moves to the fallback; the cause does not matter.
//! A fallback failure yields [`UploadOutcome::failed`]. Nothing here returns
//! an error to the caller.

use crate::config::{RunConfig, StorageCredentials};
use crate::error::UploadError;
use crate::output::UploadOutcome;
use crate::progress::ProgressCallback;
use crate::storage::{Cid, ClientFactory, CliUploader, HttpClientFactory, StorageClient};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Coordinates the primary and fallback upload paths.
#[derive(Clone)]
pub struct UploadCoordinator {
    factory: Arc<dyn ClientFactory>,
    cli: CliUploader,
    progress: Option<ProgressCallback>,
}

impl UploadCoordinator {
    pub fn new(factory: Arc<dyn ClientFactory>, cli: CliUploader) -> Self {
        Self {
            factory,
            cli,
            progress: None,
        }
    }

    /// The HTTP client plus the configured CLI program.
    pub fn from_config(config: &RunConfig) -> Self {
        let factory = HttpClientFactory {
            timeout_secs: config.http_timeout_secs,
        };
        Self::new(Arc::new(factory), CliUploader::new(config.cli_program.clone()))
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Publish `path`. Never fails; an absent CID means both paths failed.
    pub async fn upload(&self, path: &Path, credentials: &StorageCredentials) -> UploadOutcome {
        info!("Attempting to upload {} via storage client", path.display());
        match self.primary(path, credentials).await {
            Ok(cid) => {
                info!("Successfully uploaded with CID: {}", cid);
                return UploadOutcome::primary(cid);
            }
            Err(e) => {
                warn!("Storage client upload failed: {}. Falling back to CLI.", e);
                if let Some(ref cb) = self.progress {
                    cb.on_upload_fallback(&e.to_string());
                }
            }
        }

        info!("Attempting to upload {} via '{}' CLI", path.display(), self.cli.program());
        match self.cli.upload(path).await {
            Ok(cid) => {
                info!("CLI upload successful. CID: {}", cid);
                UploadOutcome::fallback(cid)
            }
            Err(e @ UploadError::CliNotFound { .. }) => {
                warn!("{}", e);
                UploadOutcome::failed()
            }
            Err(UploadError::CliFailed { code, stderr, .. }) => {
                match code {
                    Some(code) => error!("CLI upload failed with exit code {}.", code),
                    None => error!("CLI upload terminated by a signal."),
                }
                error!("Stderr: {}", stderr);
                UploadOutcome::failed()
            }
            Err(e) => {
                error!("CLI upload failed: {}", e);
                UploadOutcome::failed()
            }
        }
    }

    async fn primary(&self, path: &Path, credentials: &StorageCredentials) -> Result<Cid, UploadError> {
        let client = self.factory.connect(credentials)?;
        let read_err = |source| UploadError::ReadArtifact {
            path: path.to_path_buf(),
            source,
        };

        let meta = tokio::fs::metadata(path).await.map_err(read_err)?;
        if meta.is_dir() {
            let names = list_entries(path).await.map_err(read_err)?;
            client.upload_entries(names).await
        } else {
            let bytes = tokio::fs::read(path).await.map_err(read_err)?;
            client.upload_file(&base_name(path), bytes).await
        }
    }
}

/// Names of the immediate entries of `dir`, sorted.
async fn list_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
