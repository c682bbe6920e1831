//! Pipeline orchestration.
//!
//! ```text
//! Start ─▶ Validating ─▶ Processing ─▶ Uploading ─▶ Cleanup ─▶ Done
//!              │              │                        ▲
//!              └─▶ Done       └────────────────────────┘
//!           (input missing)      (processing failed)
//! ```
//!
//! A failed validation ends the run before anything is created, so no
//! cleanup runs. From the moment processing starts, a [`CleanupGuard`] owns
//! the artifacts and removes them on every way out of [`Pipeline::run`]
//! unless the run keeps its files.

use crate::config::RunConfig;
use crate::engine::{LocalEngine, ProcessingEngine};
use crate::error::PipelineError;
use crate::output::{RunReport, Stage};
use crate::pipeline::cleanup::{ArtifactSet, CleanupGuard};
use crate::pipeline::process::ProcessingInvoker;
use crate::pipeline::upload::UploadCoordinator;
use crate::pipeline::validate::validate_input;
use crate::progress::PipelineProgressCallback;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// A configured pipeline: engine, uploader, and the run's configuration.
pub struct Pipeline {
    config: RunConfig,
    invoker: ProcessingInvoker,
    uploader: UploadCoordinator,
}

impl Pipeline {
    /// Pipeline using `engine` and the uploaders described by `config`.
    pub fn new(config: RunConfig, engine: Arc<dyn ProcessingEngine>) -> Self {
        let uploader = UploadCoordinator::from_config(&config)
            .with_progress(config.progress_callback.clone());
        Self {
            invoker: ProcessingInvoker::new(engine),
            uploader,
            config,
        }
    }

    /// Replace the upload coordinator, keeping the configured progress callback.
    pub fn with_uploader(mut self, uploader: UploadCoordinator) -> Self {
        self.uploader = uploader.with_progress(self.config.progress_callback.clone());
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run end to end.
    ///
    /// # Errors
    /// Returns `Err(PipelineError)` only for fatal conditions:
    /// - the input does not exist (nothing is processed or removed)
    /// - processing failed (artifacts are still cleaned up)
    ///
    /// A missing CID or a failed removal does not fail the run.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let config = &self.config;
        info!("Starting pipeline run: {}", config.input.display());
        self.notify(|cb| cb.on_run_start(&config.input));

        // ── Validating ───────────────────────────────────────────────────
        self.stage_start(Stage::Validating);
        if !validate_input(&config.input) {
            return Err(PipelineError::InputNotFound {
                path: config.input.clone(),
            });
        }
        self.stage_complete(Stage::Validating);

        let guard = CleanupGuard::arm(
            ArtifactSet::from_config(config),
            config.keep_files,
            config.progress_callback.clone(),
        );

        // ── Processing ───────────────────────────────────────────────────
        self.stage_start(Stage::Processing);
        if let Err(e) = self
            .invoker
            .run(&config.app_name, &config.input, &config.output_dir)
            .await
        {
            error!(severity = "critical", "Pipeline execution failed: {}", e);
            drop(guard);
            return Err(e.into());
        }
        self.stage_complete(Stage::Processing);

        // ── Uploading ────────────────────────────────────────────────────
        self.stage_start(Stage::Uploading);
        let upload = self
            .uploader
            .upload(&config.output_dir, &config.credentials)
            .await
            .with_gateway(&config.gateway_url);
        match (&upload.cid, &upload.gateway_url) {
            (Some(cid), Some(link)) => {
                info!(cid = %cid, path = ?upload.path, "Upload complete");
                info!("Access via IPFS gateway: {}", link);
            }
            _ => warn!("Upload produced no CID; the run continues without one"),
        }
        self.stage_complete(Stage::Uploading);

        // ── Cleanup ──────────────────────────────────────────────────────
        let cleanup = guard.finish();
        if let Some(ref report) = cleanup {
            if !report.is_clean() {
                warn!("{} artifact(s) could not be removed", report.failed.len());
            }
        }

        let report = RunReport {
            input: config.input.clone(),
            output_dir: config.output_dir.clone(),
            upload,
            cleanup,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!("Pipeline run complete in {}ms", report.duration_ms);
        self.notify(|cb| cb.on_run_complete(&report));
        Ok(report)
    }

    fn notify(&self, f: impl FnOnce(&dyn PipelineProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            f(cb.as_ref());
        }
    }

    fn stage_start(&self, stage: Stage) {
        info!(stage = %stage, "Stage started");
        self.notify(|cb| cb.on_stage_start(stage));
    }

    fn stage_complete(&self, stage: Stage) {
        self.notify(|cb| cb.on_stage_complete(stage));
    }
}

/// Run the pipeline with the in-process [`LocalEngine`].
///
/// This is the primary entry point for the library.
///
/// ```rust,no_run
/// use storacha_pipeline::{run, RunConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfig::from_env("words.txt", false)?;
/// let report = run(&config).await?;
/// if let Some(cid) = report.upload.cid {
///     println!("{cid}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run(config: &RunConfig) -> Result<RunReport, PipelineError> {
    Pipeline::new(config.clone(), Arc::new(LocalEngine::default()))
        .run()
        .await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &RunConfig) -> Result<RunReport, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}
