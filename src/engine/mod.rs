//! Processing-engine contract.
//!
//! The pipeline only needs "open a session, submit the transform over an
//! input, get an output directory back, close the session". Anything that can
//! do that implements [`ProcessingEngine`]; [`local::LocalEngine`] is the
//! in-process implementation the CLI ships with.
//!
//! Sessions are synchronous: the processing stage drives them from a blocking
//! thread, see [`crate::pipeline::process`].

pub mod local;

use crate::error::ProcessingError;
use std::path::Path;

pub use local::LocalEngine;

/// A processing engine able to open sessions.
pub trait ProcessingEngine: Send + Sync {
    /// Open a session registered under `app_name`.
    fn start_session(&self, app_name: &str) -> Result<Box<dyn EngineSession>, ProcessingError>;
}

/// A live engine connection.
pub trait EngineSession: Send {
    fn app_name(&self) -> &str;

    /// Count words of the line-oriented text at `input`, writing key/count
    /// records as part-files under the `output` directory.
    fn word_count(&mut self, input: &Path, output: &Path) -> Result<(), ProcessingError>;

    /// Release the session. Must be safe to call more than once.
    fn stop(&mut self);
}
