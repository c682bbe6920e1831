//! Progress-callback trait for stage-level pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to observe the run
//! as it moves through its stages. The CLI uses this to drive a spinner;
//! tests use it to assert which stages actually ran.
//!
//! # Example
//!
//! ```rust
//! use storacha_pipeline::{PipelineProgressCallback, RunConfig, Stage, StorageCredentials};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl PipelineProgressCallback for PrintStages {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = RunConfig::builder("input.txt")
//!     .app_name("word-count")
//!     .credentials(StorageCredentials::new("https://up.storacha.network", "token"))
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{RunReport, Stage};
use std::sync::Arc;

/// Called by the orchestrator as the run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once, after configuration is resolved and before validation.
    fn on_run_start(&self, input: &std::path::Path) {
        let _ = input;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes without a fatal error.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when the primary upload failed and the CLI fallback is about to run.
    ///
    /// # Arguments
    /// * `reason` — human-readable description of the primary failure
    fn on_upload_fallback(&self, reason: &str) {
        let _ = reason;
    }

    /// Called once when the run finishes successfully.
    fn on_run_complete(&self, report: &RunReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
