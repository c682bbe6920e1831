//! # storacha-pipeline
//!
//! A one-shot batch pipeline: validate a local text file, run a word count
//! over it on a processing engine, and publish the result to the Storacha
//! content-addressed storage network.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input file
//!  │
//!  ├─ 1. Validate  the file must exist (empty only warns)
//!  ├─ 2. Process   engine session → word count → part-files (session always released)
//!  ├─ 3. Upload    HTTP client, else `storacha up <dir>`; a missing CID is not fatal
//!  └─ 4. Cleanup   remove input and output (skipped with keep-files)
//! ```
//!
//! Configuration, validation and processing failures fail the run. Upload
//! and cleanup failures degrade it: they are logged and show up in the
//! [`RunReport`], but the run still succeeds.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storacha_pipeline::{run, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads STORACHA_API_TOKEN, STORACHA_API_URL and SPARK_APP_NAME
//!     let config = RunConfig::from_env("words.txt", false)?;
//!     let report = run(&config).await?;
//!     match report.upload.cid {
//!         Some(cid) => println!("{cid}"),
//!         None => eprintln!("upload failed on both paths"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `storacha-pipeline` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RunConfig, RunConfigBuilder, StorageCredentials};
pub use engine::{EngineSession, LocalEngine, ProcessingEngine};
pub use error::{PipelineError, ProcessingError, UploadError};
pub use output::{CleanupFailure, CleanupReport, RunReport, Stage, UploadOutcome, UploadPath};
pub use pipeline::cleanup::{cleanup, ArtifactSet};
pub use pipeline::upload::UploadCoordinator;
pub use pipeline::validate::validate_input;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{run, run_sync, Pipeline};
pub use storage::{Cid, ClientFactory, CliUploader, StorageClient};
