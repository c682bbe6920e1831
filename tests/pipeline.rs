//! End-to-end tests for storacha-pipeline.
//!
//! The real [`LocalEngine`] does the processing; the storage network is
//! replaced by in-memory clients, and the storage CLI by either a binary name
//! that does not exist or (on unix) a small shell script.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storacha_pipeline::{
    Cid, ClientFactory, CliUploader, EngineSession, LocalEngine, Pipeline, PipelineError,
    PipelineProgressCallback, ProcessingEngine, ProcessingError, RunConfig, Stage,
    StorageClient, StorageCredentials, UploadCoordinator, UploadError, UploadPath,
};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const MISSING_CLI: &str = "storacha-definitely-not-installed-7f3a";

/// Primary storage client double: counts connections and uploads.
struct FakeStorage {
    connects: AtomicUsize,
    uploads: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl FakeStorage {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            connects: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
            fail,
        })
    }
}

struct FakeClient(Arc<FakeStorage>);

#[async_trait]
impl StorageClient for FakeClient {
    async fn upload_file(&self, name: &str, _bytes: Vec<u8>) -> Result<Cid, UploadError> {
        self.upload_entries(vec![name.to_string()]).await
    }

    async fn upload_entries(&self, names: Vec<String>) -> Result<Cid, UploadError> {
        self.0.uploads.lock().unwrap().push(names);
        if self.0.fail {
            Err(UploadError::Request("connection reset".into()))
        } else {
            Ok(Cid::new("bafyprimary").unwrap())
        }
    }
}

struct FakeFactory(Arc<FakeStorage>);

impl ClientFactory for FakeFactory {
    fn connect(&self, _: &StorageCredentials) -> Result<Arc<dyn StorageClient>, UploadError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeClient(Arc::clone(&self.0))))
    }
}

/// Engine double that always fails the transform.
struct BrokenEngine {
    stops: Arc<AtomicUsize>,
}

struct BrokenSession {
    stops: Arc<AtomicUsize>,
}

impl ProcessingEngine for BrokenEngine {
    fn start_session(&self, _app_name: &str) -> Result<Box<dyn EngineSession>, ProcessingError> {
        Ok(Box::new(BrokenSession {
            stops: Arc::clone(&self.stops),
        }))
    }
}

impl EngineSession for BrokenSession {
    fn app_name(&self) -> &str {
        "broken"
    }

    fn word_count(&mut self, _input: &Path, _output: &Path) -> Result<(), ProcessingError> {
        Err(ProcessingError::Transform("executor lost".into()))
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct StageRecorder {
    started: Mutex<Vec<Stage>>,
    fallbacks: AtomicUsize,
}

impl PipelineProgressCallback for StageRecorder {
    fn on_stage_start(&self, stage: Stage) {
        self.started.lock().unwrap().push(stage);
    }

    fn on_upload_fallback(&self, _reason: &str) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
    }
}

impl StageRecorder {
    fn started(&self) -> Vec<Stage> {
        self.started.lock().unwrap().clone()
    }
}

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn fixture(contents: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    std::fs::write(&input, contents).unwrap();
    let output = dir.path().join("spark_output");
    Fixture { dir, input, output }
}

fn config(fx: &Fixture, keep_files: bool, recorder: &Arc<StageRecorder>) -> RunConfig {
    RunConfig::builder(&fx.input)
        .output_dir(&fx.output)
        .keep_files(keep_files)
        .app_name("word-count-test")
        .credentials(StorageCredentials::new("https://api.example", "token"))
        .cli_program(MISSING_CLI)
        .progress_callback(Arc::clone(recorder) as Arc<dyn PipelineProgressCallback>)
        .build()
        .expect("valid config")
}

fn pipeline(
    config: RunConfig,
    engine: Arc<dyn ProcessingEngine>,
    storage: &Arc<FakeStorage>,
    cli: CliUploader,
) -> Pipeline {
    let coordinator = UploadCoordinator::new(Arc::new(FakeFactory(Arc::clone(storage))), cli);
    Pipeline::new(config, engine).with_uploader(coordinator)
}

/// Shared in-memory sink for captured log output.
#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogSink {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

// ── Scenario A: everything succeeds ──────────────────────────────────────────

#[tokio::test]
async fn primary_success_reports_cid_and_removes_artifacts() {
    let fx = fixture("the quick brown fox\nthe lazy dog\n");
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(false);
    let engine = Arc::new(LocalEngine::default());

    let report = pipeline(
        config(&fx, false, &recorder),
        engine.clone(),
        &storage,
        CliUploader::new(MISSING_CLI),
    )
    .run()
    .await
    .expect("run should succeed");

    assert_eq!(report.upload.path, UploadPath::Primary);
    assert_eq!(report.upload.cid.as_ref().map(Cid::as_str), Some("bafyprimary"));
    assert_eq!(
        report.upload.gateway_url.as_deref(),
        Some("https://ipfs.io/ipfs/bafyprimary")
    );

    // The output directory was uploaded as a manifest of its entries.
    let uploads = storage.uploads.lock().unwrap().clone();
    assert_eq!(uploads, vec![vec!["_SUCCESS", "part-00000", "part-00001"]]);

    let cleanup = report.cleanup.expect("cleanup ran");
    assert_eq!(cleanup.removed, vec![fx.input.clone(), fx.output.clone()]);
    assert!(!fx.input.exists());
    assert!(!fx.output.exists());

    assert!(engine.active_session().is_none());
    assert_eq!(
        recorder.started(),
        vec![Stage::Validating, Stage::Processing, Stage::Uploading, Stage::Cleanup]
    );
    assert_eq!(recorder.fallbacks.load(Ordering::SeqCst), 0);
}

// ── Scenario B: primary fails, CLI missing ───────────────────────────────────

#[tokio::test]
async fn primary_failure_with_missing_cli_still_succeeds() {
    let fx = fixture("hello world");
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(true);

    let sink = LogSink::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _log_guard = tracing::subscriber::set_default(subscriber);

    let report = pipeline(
        config(&fx, false, &recorder),
        Arc::new(LocalEngine::default()),
        &storage,
        CliUploader::new(MISSING_CLI),
    )
    .run()
    .await
    .expect("processing succeeded, so the run succeeds");

    assert!(report.upload.cid.is_none());
    assert_eq!(report.upload.path, UploadPath::None);
    assert!(report.upload.gateway_url.is_none());
    assert_eq!(storage.uploads.lock().unwrap().len(), 1, "primary attempted once");
    assert_eq!(recorder.fallbacks.load(Ordering::SeqCst), 1, "fallback attempted once");

    let logs = sink.contents();
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains(&format!("The '{MISSING_CLI}' command was not found")), "logs: {logs}");

    // Cleanup still ran.
    assert!(!fx.input.exists());
    assert!(!fx.output.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn primary_failure_falls_back_to_cli() {
    use std::os::unix::fs::PermissionsExt;

    let fx = fixture("hello world");
    let program = fx.dir.path().join("fake-storacha");
    std::fs::write(
        &program,
        "#!/bin/sh\necho 'Uploading...'\necho 'Upload complete. CID: bafycli42'\n",
    )
    .unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(true);

    let report = pipeline(
        config(&fx, false, &recorder),
        Arc::new(LocalEngine::default()),
        &storage,
        CliUploader::new(program.to_string_lossy()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.upload.path, UploadPath::Fallback);
    assert_eq!(report.upload.cid.unwrap().as_str(), "bafycli42");
}

// ── Scenario C: input missing ────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_aborts_before_processing() {
    let fx = fixture("");
    std::fs::remove_file(&fx.input).unwrap();
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(false);
    let stops = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(BrokenEngine {
        stops: Arc::clone(&stops),
    });

    let err = pipeline(
        config(&fx, false, &recorder),
        engine,
        &storage,
        CliUploader::new(MISSING_CLI),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::InputNotFound { ref path } if path == &fx.input));
    assert_eq!(recorder.started(), vec![Stage::Validating]);
    assert_eq!(stops.load(Ordering::SeqCst), 0, "no session opened");
    assert_eq!(storage.connects.load(Ordering::SeqCst), 0, "no upload attempted");
}

#[tokio::test]
async fn empty_input_is_processed() {
    let fx = fixture("");
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(false);

    let report = pipeline(
        config(&fx, true, &recorder),
        Arc::new(LocalEngine::default()),
        &storage,
        CliUploader::new(MISSING_CLI),
    )
    .run()
    .await
    .unwrap();

    assert!(report.upload.is_success());
    assert!(fx.output.join("_SUCCESS").exists());
}

// ── Scenario D: keep files ───────────────────────────────────────────────────

#[tokio::test]
async fn keep_files_never_cleans_up() {
    let fx = fixture("alpha beta alpha");
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(false);

    let report = pipeline(
        config(&fx, true, &recorder),
        Arc::new(LocalEngine::default()),
        &storage,
        CliUploader::new(MISSING_CLI),
    )
    .run()
    .await
    .unwrap();

    assert!(report.cleanup.is_none());
    assert!(fx.input.exists());
    assert!(fx.output.join("part-00000").exists());
    assert!(!recorder.started().contains(&Stage::Cleanup));

    let mut records: Vec<String> = ["part-00000", "part-00001"]
        .iter()
        .flat_map(|p| {
            std::fs::read_to_string(fx.output.join(p))
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    records.sort();
    assert_eq!(records, vec!["('alpha', 2)", "('beta', 1)"]);
}

#[tokio::test]
async fn keep_files_survives_processing_failure() {
    let fx = fixture("x");
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(false);
    let engine = Arc::new(BrokenEngine {
        stops: Arc::new(AtomicUsize::new(0)),
    });

    let err = pipeline(config(&fx, true, &recorder), engine, &storage, CliUploader::new(MISSING_CLI))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Processing(_)));
    assert!(fx.input.exists());
    assert!(!recorder.started().contains(&Stage::Cleanup));
}

// ── Processing failure ───────────────────────────────────────────────────────

#[tokio::test]
async fn processing_failure_skips_upload_but_cleans_up() {
    let fx = fixture("some words");
    let recorder = Arc::new(StageRecorder::default());
    let storage = FakeStorage::new(false);
    let stops = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(BrokenEngine {
        stops: Arc::clone(&stops),
    });

    let err = pipeline(
        config(&fx, false, &recorder),
        engine,
        &storage,
        CliUploader::new(MISSING_CLI),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Processing(ProcessingError::Transform(_))
    ));
    assert_eq!(stops.load(Ordering::SeqCst), 1, "session released");
    assert_eq!(storage.connects.load(Ordering::SeqCst), 0, "upload skipped");
    assert!(!fx.input.exists(), "cleanup ran on the failure path");
    assert_eq!(
        recorder.started(),
        vec![Stage::Validating, Stage::Processing, Stage::Cleanup]
    );
}

// ── Configuration ────────────────────────────────────────────────────────────

#[test]
fn missing_environment_is_fatal_before_any_stage() {
    let err = RunConfig::from_lookup("input.txt", false, |key| match key {
        "STORACHA_API_URL" => Some("https://api.example".to_string()),
        _ => None,
    })
    .unwrap_err();

    match err {
        PipelineError::MissingEnvironment { vars } => {
            assert_eq!(vars, vec!["STORACHA_API_TOKEN", "SPARK_APP_NAME"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}
