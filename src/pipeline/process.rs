//! Processing stage: run the transform inside a scoped engine session.
//!
//! ## Why a guard?
//!
//! The session must be released on every exit path: success, a transform
//! error, or a panic inside the engine. [`SessionGuard`] owns the session and
//! calls `stop()` from `Drop`, so release does not depend on every branch
//! remembering to close it.
//!
//! The engine API is blocking, so the whole session lives on a
//! `spawn_blocking` thread and never crosses an `.await`.

use crate::engine::{EngineSession, ProcessingEngine};
use crate::error::ProcessingError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns a live session and stops it when dropped.
pub struct SessionGuard {
    session: Box<dyn EngineSession>,
}

impl SessionGuard {
    pub fn start(engine: &dyn ProcessingEngine, app_name: &str) -> Result<Self, ProcessingError> {
        let session = engine.start_session(app_name)?;
        debug!("Acquired session '{}'", session.app_name());
        Ok(Self { session })
    }

    pub fn session(&mut self) -> &mut dyn EngineSession {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.stop();
        debug!("Released session '{}'", self.session.app_name());
    }
}

/// Submits the transform to a processing engine.
#[derive(Clone)]
pub struct ProcessingInvoker {
    engine: Arc<dyn ProcessingEngine>,
}

impl ProcessingInvoker {
    pub fn new(engine: Arc<dyn ProcessingEngine>) -> Self {
        Self { engine }
    }

    /// Count words in `input`, writing the result under `output`.
    ///
    /// The session opened for this call is released before it returns,
    /// whatever the outcome.
    pub async fn run(&self, app_name: &str, input: &Path, output: &Path) -> Result<(), ProcessingError> {
        info!("Starting processing for input: {}", input.display());

        let engine = Arc::clone(&self.engine);
        let app_name = app_name.to_string();
        let input_owned = input.to_path_buf();
        let output_owned = output.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut guard = SessionGuard::start(engine.as_ref(), &app_name)?;
            guard.session().word_count(&input_owned, &output_owned)
        })
        .await
        .map_err(|e| ProcessingError::Panicked(e.to_string()))??;

        info!("Processing complete. Output saved to {}", output.display());
        Ok(())
    }
}
