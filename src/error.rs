//! Error types for the storacha-pipeline library.
//!
//! Two tiers of failure reflect how the run treats them:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot produce a result
//!   (configuration missing, input missing, transform failed). Returned as
//!   `Err(PipelineError)` from [`crate::run::run`].
//!
//! * [`UploadError`] — **Recoverable**: one upload path failed. A primary
//!   failure triggers the CLI fallback; a fallback failure is logged and
//!   surfaces only as an absent CID in [`crate::output::UploadOutcome`].
//!
//! Cleanup failures are not errors at all from the run's point of view; they
//! are collected in [`crate::output::CleanupReport`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// One or more required environment variables are absent or empty.
    #[error("Missing required environment variables: {}\nSet them in the environment or in a .env file.", vars.join(", "))]
    MissingEnvironment { vars: Vec<String> },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Validation errors ─────────────────────────────────────────────────
    /// The input artifact does not exist.
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    // ── Processing errors ─────────────────────────────────────────────────
    /// The processing stage failed; the session has already been released.
    #[error("Processing failed: {0}")]
    Processing(#[from] ProcessingError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures inside the processing stage, wrapping the engine's own error.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The engine refused to open a session.
    #[error("Failed to start session '{app_name}': {detail}")]
    SessionStart { app_name: String, detail: String },

    /// The engine already has a live session.
    #[error("Engine already has a live session ('{active}')")]
    SessionBusy { active: String },

    /// The input could not be read by the engine.
    #[error("Cannot read input '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine never overwrites an existing output location.
    #[error("Output directory '{path}' already exists")]
    OutputExists { path: PathBuf },

    /// Writing a part-file or marker failed.
    #[error("Failed to write output '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transform itself reported a failure.
    #[error("Transform failed: {0}")]
    Transform(String),

    /// The blocking task running the transform panicked or was cancelled.
    #[error("Processing task aborted: {0}")]
    Panicked(String),
}

/// A non-fatal failure of one upload path.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The primary client could not be constructed from the credentials.
    #[error("Failed to initialise storage client: {0}")]
    ClientInit(String),

    /// Transport-level failure talking to the storage API.
    #[error("Storage request failed: {0}")]
    Request(String),

    /// The storage API answered with a non-success status.
    #[error("Storage API rejected upload (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The storage API answered but the body carried no usable CID.
    #[error("Invalid storage API response: {0}")]
    InvalidResponse(String),

    /// The artifact could not be read for upload.
    #[error("Failed to read '{path}' for upload: {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CLI binary is not installed or not on `PATH`.
    #[error("The '{program}' command was not found. Is the CLI installed and in your PATH?")]
    CliNotFound { program: String },

    /// The CLI ran but exited unsuccessfully.
    #[error("'{program}' exited with {}: {stderr}", code.map(|c| format!("code {c}")).unwrap_or_else(|| "a signal".to_string()))]
    CliFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The CLI could not be spawned for another reason.
    #[error("Failed to run '{program}': {source}")]
    CliSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The CLI succeeded but printed no line carrying a CID.
    #[error("CID not found in CLI output")]
    CidNotFound,
}
