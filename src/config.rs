//! Run configuration.
//!
//! Every knob of a run lives in [`RunConfig`], built once at process entry
//! through [`RunConfigBuilder`] (or [`RunConfig::from_env`]) and then passed
//! by reference to each stage. No stage reads the environment itself.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable holding the storage API token.
pub const ENV_API_TOKEN: &str = "STORACHA_API_TOKEN";
/// Environment variable holding the storage API endpoint.
pub const ENV_API_URL: &str = "STORACHA_API_URL";
/// Environment variable naming the processing application.
pub const ENV_APP_NAME: &str = "SPARK_APP_NAME";
/// Optional: name or path of the storage CLI used by the fallback path.
pub const ENV_CLI_PROGRAM: &str = "STORACHA_CLI";
/// Optional: directory the engine writes its output to.
pub const ENV_OUTPUT_DIR: &str = "PIPELINE_OUTPUT_DIR";
/// Optional: public gateway prefix used when reporting a CID.
pub const ENV_GATEWAY_URL: &str = "STORACHA_GATEWAY_URL";

pub const DEFAULT_OUTPUT_DIR: &str = "spark_output";
pub const DEFAULT_CLI_PROGRAM: &str = "storacha";
pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs/";

/// Endpoint and token for the storage network.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub endpoint: String,
    pub token: String,
}

impl StorageCredentials {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Immutable configuration for a single pipeline run.
///
/// # Example
/// ```rust
/// use storacha_pipeline::{RunConfig, StorageCredentials};
///
/// let config = RunConfig::builder("input.txt")
///     .app_name("word-count")
///     .credentials(StorageCredentials::new("https://up.storacha.network", "token"))
///     .keep_files(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_dir.to_str(), Some("spark_output"));
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// The input artifact. Consumed by the run and removed during cleanup.
    pub input: PathBuf,

    /// Directory the processing engine writes to. Must not exist beforehand.
    pub output_dir: PathBuf,

    /// Keep the input and output on disk instead of removing them. Default: false.
    pub keep_files: bool,

    /// Application name handed to the processing engine when opening a session.
    pub app_name: String,

    /// Credentials for the primary (library) upload path.
    pub credentials: StorageCredentials,

    /// Program invoked by the fallback upload path. Default: `storacha`.
    pub cli_program: String,

    /// Public gateway prefix; the CID is appended to it in reports.
    pub gateway_url: String,

    /// Per-request timeout for the primary HTTP client in seconds. Default: 120.
    ///
    /// The fallback CLI has no timeout and blocks until it exits.
    pub http_timeout_secs: u64,

    /// Optional observer for stage transitions.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("input", &self.input)
            .field("output_dir", &self.output_dir)
            .field("keep_files", &self.keep_files)
            .field("app_name", &self.app_name)
            .field("credentials", &self.credentials)
            .field("cli_program", &self.cli_program)
            .field("gateway_url", &self.gateway_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for the given input artifact.
    pub fn builder(input: impl AsRef<Path>) -> RunConfigBuilder {
        RunConfigBuilder {
            input: input.as_ref().to_path_buf(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            keep_files: false,
            app_name: None,
            credentials: None,
            cli_program: DEFAULT_CLI_PROGRAM.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            http_timeout_secs: 120,
            progress_callback: None,
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// Fails with [`PipelineError::MissingEnvironment`] naming every required
    /// variable that is absent or empty.
    pub fn from_env(input: impl AsRef<Path>, keep_files: bool) -> Result<Self, PipelineError> {
        Self::from_lookup(input, keep_files, |key| std::env::var(key).ok())
    }

    /// Like [`RunConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(
        input: impl AsRef<Path>,
        keep_files: bool,
        lookup: F,
    ) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = read(ENV_API_TOKEN);
        let url = read(ENV_API_URL);
        let app_name = read(ENV_APP_NAME);

        let missing: Vec<String> = [
            (ENV_API_TOKEN, token.is_none()),
            (ENV_API_URL, url.is_none()),
            (ENV_APP_NAME, app_name.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect();

        let (Some(token), Some(url), Some(app_name)) = (token, url, app_name) else {
            return Err(PipelineError::MissingEnvironment { vars: missing });
        };

        let mut builder = Self::builder(input)
            .keep_files(keep_files)
            .app_name(app_name)
            .credentials(StorageCredentials::new(url, token));

        if let Some(dir) = read(ENV_OUTPUT_DIR) {
            builder = builder.output_dir(dir);
        }
        if let Some(program) = read(ENV_CLI_PROGRAM) {
            builder = builder.cli_program(program);
        }
        if let Some(gateway) = read(ENV_GATEWAY_URL) {
            builder = builder.gateway_url(gateway);
        }

        builder.build()
    }

    /// The paths this run treats as ephemeral, in removal order.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        vec![self.input.clone(), self.output_dir.clone()]
    }
}

/// Builder for [`RunConfig`].
pub struct RunConfigBuilder {
    input: PathBuf,
    output_dir: PathBuf,
    keep_files: bool,
    app_name: Option<String>,
    credentials: Option<StorageCredentials>,
    cli_program: String,
    gateway_url: String,
    http_timeout_secs: u64,
    progress_callback: Option<ProgressCallback>,
}

impl RunConfigBuilder {
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn credentials(mut self, credentials: StorageCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn cli_program(mut self, program: impl Into<String>) -> Self {
        self.cli_program = program.into();
        self
    }

    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, PipelineError> {
        let app_name = self
            .app_name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| PipelineError::InvalidConfig("application name is required".into()))?;
        let credentials = self
            .credentials
            .filter(|c| !c.endpoint.trim().is_empty() && !c.token.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::InvalidConfig("storage endpoint and token are required".into())
            })?;
        if self.cli_program.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "fallback CLI program must not be empty".into(),
            ));
        }
        if self.input == self.output_dir {
            return Err(PipelineError::InvalidConfig(format!(
                "output directory must differ from the input path ({})",
                self.input.display()
            )));
        }

        Ok(RunConfig {
            input: self.input,
            output_dir: self.output_dir,
            keep_files: self.keep_files,
            app_name,
            credentials,
            cli_program: self.cli_program,
            gateway_url: self.gateway_url,
            http_timeout_secs: self.http_timeout_secs,
            progress_callback: self.progress_callback,
        })
    }
}
