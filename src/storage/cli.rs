//! Command-line storage client: the fallback upload path.
//!
//! Runs `<program> up <path>` with an explicit argument vector (no shell),
//! waits for it to exit, and scans stdout for the CID. There is no timeout:
//! the call blocks for as long as the CLI runs.

use super::Cid;
use crate::error::UploadError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Extract the CID from CLI stdout.
///
/// Takes the first line containing the literal `CID`; the identifier is
/// whatever follows the last `:` on that line, trimmed. Returns `None` when no
/// line carries the marker or the identifier is empty.
///
/// ```rust
/// use storacha_pipeline::storage::extract_cid;
///
/// let cid = extract_cid("Uploading...\nUpload complete. CID: bafy123\n").unwrap();
/// assert_eq!(cid.as_str(), "bafy123");
/// ```
pub fn extract_cid(stdout: &str) -> Option<Cid> {
    let line = stdout.lines().find(|line| line.contains("CID"))?;
    let tail = line.rsplit(':').next().unwrap_or(line);
    Cid::new(tail)
}

/// Runs the storage CLI as a subprocess.
#[derive(Debug, Clone)]
pub struct CliUploader {
    program: String,
}

impl CliUploader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Upload `path` and return the CID printed by the CLI.
    pub async fn upload(&self, path: &Path) -> Result<Cid, UploadError> {
        debug!("Running: {} up {}", self.program, path.display());

        let output = Command::new(&self.program)
            .arg("up")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    UploadError::CliNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    UploadError::CliSpawn {
                        program: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        if !output.status.success() {
            return Err(UploadError::CliFailed {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        extract_cid(&stdout).ok_or(UploadError::CidNotFound)
    }
}
