//! Input validation: cheap checks before any expensive work starts.

use std::path::Path;
use tracing::{debug, error, warn};

/// Check that the input artifact exists.
///
/// Returns `false` (and logs) when the path cannot be found. A zero-length
/// file is accepted with a warning. Nothing on disk is touched.
pub fn validate_input(path: &Path) -> bool {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            error!("Input file not found: {} ({})", path.display(), e);
            return false;
        }
    };

    if meta.is_file() && meta.len() == 0 {
        warn!("Input file is empty: {}", path.display());
    } else {
        debug!("Validated input: {} ({} bytes)", path.display(), meta.len());
    }
    true
}
