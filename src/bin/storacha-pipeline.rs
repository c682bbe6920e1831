//! CLI binary for storacha-pipeline.
//!
//! A thin shim over the library crate: loads `.env`, builds a `RunConfig`
//! from the environment plus the two CLI arguments, runs the pipeline and
//! prints the resulting CID.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storacha_pipeline::{
    run, PipelineProgressCallback, ProgressCallback, RunConfig, RunReport, Stage,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner showing the current stage, with a line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Pipeline");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, input: &std::path::Path) {
        self.bar.set_message(format!("starting on {}", input.display()));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar.println(format!("  {} {}", green("✓"), stage));
    }

    fn on_upload_fallback(&self, reason: &str) {
        let msg = if reason.len() > 80 {
            let cut = (0..=79).rev().find(|&i| reason.is_char_boundary(i)).unwrap_or(0);
            format!("{}\u{2026}", &reason[..cut])
        } else {
            reason.to_string()
        };
        self.bar
            .println(format!("  {} primary upload failed: {}", yellow("⚠"), dim(&msg)));
    }

    fn on_run_complete(&self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}

/// Validate a text file, word-count it, and publish the result to Storacha.
#[derive(Parser, Debug)]
#[command(
    name = "storacha-pipeline",
    version,
    about = "Word-count a text file and publish the result to Storacha",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// The path to the input file.
    input_file: PathBuf,

    /// Keep generated files after execution.
    #[arg(long)]
    keep_files: bool,
}

const AFTER_HELP: &str = r#"ENVIRONMENT VARIABLES:
  STORACHA_API_TOKEN    Storage API token (required)
  STORACHA_API_URL      Storage API endpoint (required)
  SPARK_APP_NAME        Processing application name (required)
  STORACHA_CLI          Fallback CLI program (default: storacha)
  PIPELINE_OUTPUT_DIR   Engine output directory (default: spark_output)
  STORACHA_GATEWAY_URL  Gateway prefix for reported links (default: https://ipfs.io/ipfs/)
  RUST_LOG              Log filter (default: info)

A .env file in the working directory is loaded first.
"#;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the spinner active only warnings and errors are logged; the
    // spinner covers the rest.
    let show_progress = io::stderr().is_terminal() && std::env::var_os("RUST_LOG").is_none();
    let filter = if show_progress { "warn" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut config =
        RunConfig::from_env(&cli.input_file, cli.keep_files).context("Configuration error")?;
    if show_progress {
        config.progress_callback = Some(CliProgressCallback::new() as ProgressCallback);
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&config).await.context("Pipeline failed")?;

    match (&report.upload.cid, &report.upload.gateway_url) {
        (Some(cid), link) => {
            println!("{cid}");
            eprintln!(
                "{}  uploaded via {:?} path  {}ms",
                green("✔"),
                report.upload.path,
                report.duration_ms
            );
            if let Some(link) = link {
                eprintln!("   {}", bold(link));
            }
        }
        (None, _) => {
            eprintln!(
                "{}  processing succeeded but the upload produced no CID  {}ms",
                yellow("⚠"),
                report.duration_ms
            );
        }
    }

    if let Some(ref cleanup) = report.cleanup {
        for failure in &cleanup.failed {
            eprintln!(
                "   {} could not remove {}: {}",
                yellow("⚠"),
                failure.path.display(),
                failure.error
            );
        }
    }

    Ok(())
}
