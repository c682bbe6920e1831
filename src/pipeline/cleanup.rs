//! Cleanup stage: remove the run's ephemeral artifacts.
//!
//! Each path is handled on its own. A file is removed, a directory is removed
//! with everything under it, and a path that does not exist is skipped. A
//! failure on one path is logged and the remaining paths are still attempted.
//!
//! [`CleanupGuard`] ties cleanup to scope: armed right after validation, it
//! runs cleanup when the orchestrator finishes normally *or* leaves early
//! through a processing error or a panic.

use crate::config::RunConfig;
use crate::output::{CleanupFailure, CleanupReport, Stage};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// The paths treated as ephemeral for one run.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// The input artifact and the engine output directory.
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.artifact_paths())
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every artifact, consuming the set.
    pub fn remove_all(self) -> CleanupReport {
        cleanup(&self.paths)
    }
}

/// Remove `paths`. Never fails; per-path outcomes land in the report.
pub fn cleanup(paths: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths {
        match remove_path(path) {
            Ok(Removal::File) => {
                info!("Removed file: {}", path.display());
                report.removed.push(path.clone());
            }
            Ok(Removal::Directory) => {
                info!("Removed directory: {}", path.display());
                report.removed.push(path.clone());
            }
            Ok(Removal::Absent) => {
                debug!("Nothing to remove at {}", path.display());
                report.skipped.push(path.clone());
            }
            Err(e) => {
                error!("Error removing {}: {}", path.display(), e);
                report.failed.push(CleanupFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

enum Removal {
    File,
    Directory,
    Absent,
}

fn remove_path(path: &Path) -> std::io::Result<Removal> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(e) => return Err(e),
    };

    if meta.is_file() {
        std::fs::remove_file(path)?;
        Ok(Removal::File)
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
        Ok(Removal::Directory)
    } else {
        // Sockets, fifos and the like are not ours to remove.
        Ok(Removal::Absent)
    }
}

/// Runs cleanup exactly once, when finished or dropped.
///
/// A disarmed guard (keep-files) never touches the filesystem.
pub struct CleanupGuard {
    artifacts: Option<ArtifactSet>,
    progress: Option<ProgressCallback>,
}

impl CleanupGuard {
    pub fn arm(artifacts: ArtifactSet, keep_files: bool, progress: Option<ProgressCallback>) -> Self {
        if keep_files {
            info!("Keeping generated files; cleanup disabled");
        }
        Self {
            artifacts: (!keep_files).then_some(artifacts),
            progress,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Run cleanup now. `None` when the guard was disarmed.
    pub fn finish(mut self) -> Option<CleanupReport> {
        self.run()
    }

    fn run(&mut self) -> Option<CleanupReport> {
        let artifacts = self.artifacts.take()?;
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(Stage::Cleanup);
        }
        let report = artifacts.remove_all();
        if let Some(ref cb) = self.progress {
            cb.on_stage_complete(Stage::Cleanup);
        }
        Some(report)
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> (PathBuf, PathBuf) {
        let file = dir.path().join("input.txt");
        std::fs::write(&file, "hello").unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("nested")).unwrap();
        std::fs::write(out.join("part-00000"), "x").unwrap();
        std::fs::write(out.join("nested").join("deep"), "y").unwrap();
        (file, out)
    }

    #[test]
    fn removes_files_and_directories_recursively() {
        let dir = TempDir::new().unwrap();
        let (file, out) = fixture(&dir);

        let report = cleanup(&[file.clone(), out.clone()]);
        assert!(!file.exists());
        assert!(!out.exists());
        assert_eq!(report.removed, vec![file, out]);
        assert!(report.is_clean());
    }

    #[test]
    fn second_cleanup_skips_silently() {
        let dir = TempDir::new().unwrap();
        let (file, out) = fixture(&dir);
        let paths = vec![file, out];

        cleanup(&paths);
        let again = cleanup(&paths);
        assert!(again.removed.is_empty());
        assert!(again.is_clean());
        assert_eq!(again.skipped, paths);
    }

    #[cfg(unix)]
    #[test]
    fn one_failure_does_not_stop_the_rest() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let stuck = locked.join("stuck.txt");
        std::fs::write(&stuck, "x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Root ignores directory permissions; nothing to observe then.
        if std::fs::remove_file(&stuck).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let free = dir.path().join("free.txt");
        std::fs::write(&free, "y").unwrap();

        let report = cleanup(&[stuck.clone(), free.clone()]);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, stuck);
        assert_eq!(report.removed, vec![free.clone()]);
        assert!(!free.exists());
    }

    #[test]
    fn guard_cleans_on_drop() {
        let dir = TempDir::new().unwrap();
        let (file, out) = fixture(&dir);
        {
            let _guard = CleanupGuard::arm(ArtifactSet::new(vec![file.clone(), out.clone()]), false, None);
        }
        assert!(!file.exists());
        assert!(!out.exists());
    }

    #[test]
    fn disarmed_guard_keeps_files() {
        let dir = TempDir::new().unwrap();
        let (file, out) = fixture(&dir);
        let guard = CleanupGuard::arm(ArtifactSet::new(vec![file.clone(), out.clone()]), true, None);
        assert!(!guard.is_armed());
        assert!(guard.finish().is_none());
        assert!(file.exists());
        assert!(out.exists());
    }

    #[test]
    fn finish_runs_only_once() {
        let dir = TempDir::new().unwrap();
        let (file, out) = fixture(&dir);
        let guard = CleanupGuard::arm(ArtifactSet::new(vec![file, out]), false, None);
        let report = guard.finish().unwrap();
        assert_eq!(report.removed.len(), 2);
        assert!(report.skipped.is_empty());
    }
}
