//! Result types produced by a pipeline run.

use crate::storage::Cid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A stage of the run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validating,
    Processing,
    Uploading,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Processing => "processing",
            Stage::Uploading => "uploading",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Which upload path produced the CID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPath {
    /// The library client accepted the upload.
    Primary,
    /// The primary failed; the CLI accepted the upload.
    Fallback,
    /// Both paths failed.
    None,
}

/// Result of the upload stage.
///
/// An absent `cid` means both paths failed. That is not fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub cid: Option<Cid>,
    pub path: UploadPath,
    /// Public gateway link for `cid`, for human convenience only.
    pub gateway_url: Option<String>,
}

impl UploadOutcome {
    pub fn primary(cid: Cid) -> Self {
        Self {
            cid: Some(cid),
            path: UploadPath::Primary,
            gateway_url: None,
        }
    }

    pub fn fallback(cid: Cid) -> Self {
        Self {
            cid: Some(cid),
            path: UploadPath::Fallback,
            gateway_url: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            cid: None,
            path: UploadPath::None,
            gateway_url: None,
        }
    }

    /// Attach the gateway link rendered from `base`, if a CID is present.
    pub fn with_gateway(mut self, base: &str) -> Self {
        self.gateway_url = self
            .cid
            .as_ref()
            .map(|cid| crate::storage::gateway_url(base, cid));
        self
    }

    pub fn is_success(&self) -> bool {
        self.cid.is_some()
    }
}

/// A single path that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What cleanup did with each artifact path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Paths that did not exist.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of a successful run.
///
/// A run is successful when processing succeeded, even if the upload
/// produced no CID or some artifacts could not be removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub upload: UploadOutcome,
    /// `None` when the run was configured to keep its files.
    pub cleanup: Option<CleanupReport>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_is_lowercase() {
        assert_eq!(Stage::Validating.to_string(), "validating");
        assert_eq!(Stage::Cleanup.to_string(), "cleanup");
    }

    #[test]
    fn gateway_only_attached_with_cid() {
        let ok = UploadOutcome::primary(Cid::new("bafy123").unwrap())
            .with_gateway("https://ipfs.io/ipfs/");
        assert_eq!(ok.gateway_url.as_deref(), Some("https://ipfs.io/ipfs/bafy123"));

        let failed = UploadOutcome::failed().with_gateway("https://ipfs.io/ipfs/");
        assert!(failed.gateway_url.is_none());
        assert!(!failed.is_success());
        assert_eq!(failed.path, UploadPath::None);
    }

    #[test]
    fn run_report_serialises_paths_in_lowercase() {
        let report = RunReport {
            input: PathBuf::from("in.txt"),
            output_dir: PathBuf::from("out"),
            upload: UploadOutcome::fallback(Cid::new("bafyabc").unwrap()),
            cleanup: None,
            duration_ms: 12,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["upload"]["path"], "fallback");
        assert_eq!(json["upload"]["cid"], "bafyabc");
        assert!(json["cleanup"].is_null());
    }
}
