//! In-process map/reduce engine.
//!
//! Reproduces the observable behaviour of a distributed word count:
//!
//! ```text
//! input ──▶ lines ──▶ split(' ') ──▶ (word, 1) ──▶ reduce by key ──▶ part-NNNNN
//! ```
//!
//! Words are split on single spaces, so consecutive spaces and blank lines
//! yield empty-string keys, exactly as the distributed version does. Keys are
//! hash-partitioned across `partitions` part-files, each record written as
//! `('word', count)`, and an empty `_SUCCESS` marker is written last. The
//! output directory must not already exist.

use super::{EngineSession, ProcessingEngine};
use crate::error::ProcessingError;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Name of the marker written after all part-files.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// In-process engine. At most one session is live at a time.
#[derive(Debug, Clone)]
pub struct LocalEngine {
    partitions: usize,
    live: Arc<Mutex<Option<String>>>,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(2)
    }
}

impl LocalEngine {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
            live: Arc::new(Mutex::new(None)),
        }
    }

    /// Name of the live session, if any.
    pub fn active_session(&self) -> Option<String> {
        self.live.lock().ok().and_then(|g| g.clone())
    }
}

impl ProcessingEngine for LocalEngine {
    fn start_session(&self, app_name: &str) -> Result<Box<dyn EngineSession>, ProcessingError> {
        let mut live = self.live.lock().map_err(|e| ProcessingError::SessionStart {
            app_name: app_name.to_string(),
            detail: e.to_string(),
        })?;
        if let Some(active) = live.as_ref() {
            return Err(ProcessingError::SessionBusy {
                active: active.clone(),
            });
        }
        *live = Some(app_name.to_string());
        info!("Session '{}' started", app_name);

        Ok(Box::new(LocalSession {
            app_name: app_name.to_string(),
            partitions: self.partitions,
            live: Arc::clone(&self.live),
            stopped: false,
        }))
    }
}

struct LocalSession {
    app_name: String,
    partitions: usize,
    live: Arc<Mutex<Option<String>>>,
    stopped: bool,
}

impl EngineSession for LocalSession {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn word_count(&mut self, input: &Path, output: &Path) -> Result<(), ProcessingError> {
        if self.stopped {
            return Err(ProcessingError::Transform(format!(
                "session '{}' is stopped",
                self.app_name
            )));
        }
        if output.exists() {
            return Err(ProcessingError::OutputExists {
                path: output.to_path_buf(),
            });
        }

        let counts = count_words(input)?;
        debug!("{} distinct keys", counts.len());
        write_partitions(counts, output, self.partitions)
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Ok(mut live) = self.live.lock() {
            *live = None;
        }
        info!("Session '{}' stopped", self.app_name);
    }
}

/// Map + reduce: split every line on single spaces and count each token.
fn count_words(input: &Path) -> Result<HashMap<String, u64>, ProcessingError> {
    let unreadable = |source| ProcessingError::InputUnreadable {
        path: input.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(input).map_err(unreadable)?);
    let mut counts: HashMap<String, u64> = HashMap::new();
    for line in reader.lines() {
        let line = line.map_err(unreadable)?;
        for word in line.split(' ') {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

fn partition_of(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

fn write_partitions(
    counts: HashMap<String, u64>,
    output: &Path,
    partitions: usize,
) -> Result<(), ProcessingError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ProcessingError::OutputWrite { path, source }
    };

    std::fs::create_dir_all(output).map_err(write_err(output))?;

    let mut buckets: Vec<Vec<(String, u64)>> = vec![Vec::new(); partitions];
    for (word, count) in counts {
        buckets[partition_of(&word, partitions)].push((word, count));
    }

    for (idx, mut bucket) in buckets.into_iter().enumerate() {
        bucket.sort_unstable();
        let path = part_file(output, idx);
        let file = File::create(&path).map_err(write_err(&path))?;
        let mut writer = BufWriter::new(file);
        for (word, count) in &bucket {
            writeln!(writer, "({}, {})", quote(word), count).map_err(write_err(&path))?;
        }
        writer.flush().map_err(write_err(&path))?;
    }

    let marker = output.join(SUCCESS_MARKER);
    File::create(&marker).map_err(write_err(&marker))?;
    Ok(())
}

fn part_file(output: &Path, idx: usize) -> PathBuf {
    output.join(format!("part-{idx:05}"))
}

/// Quote a key the way the record format expects: single quotes unless the
/// key contains a single quote and no double quote.
fn quote(s: &str) -> String {
    let q = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(q);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            c if c == q => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(q);
    out
}
