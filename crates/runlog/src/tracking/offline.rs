//! Offline tracking backend writing runs to local directories.
//!
//! Each run gets its own directory:
//!
//! ```text
//! <root>/<run-id>/
//!     config.json     run configuration
//!     metrics.jsonl   one JSON object per logged batch, with a `_step` field
//!     summary.json    last value of every metric, written on finish
//! ```

use super::{Metrics, RunConfig, SessionError, Tracker, TrackingSession};
use crate::log::MetricValue;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const METRICS_FILE: &str = "metrics.jsonl";
const SUMMARY_FILE: &str = "summary.json";

/// Columns written by the session itself; metrics may not use them.
const STEP_KEY: &str = "_step";
const ROWS_KEY: &str = "_rows";

/// Tracker that starts runs in a local directory.
#[derive(Clone, Debug)]
pub struct OfflineTracker {
    root: PathBuf,
}

impl OfflineTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Tracker for OfflineTracker {
    type Session = OfflineSession;

    fn init(&self, config: &RunConfig) -> Result<OfflineSession, SessionError> {
        let root = config.dir.as_deref().unwrap_or(&self.root);
        let run_dir = root.join(run_id(config));

        fs::create_dir_all(&run_dir).map_err(|e| {
            SessionError::Init(format!("cannot create {}: {}", run_dir.display(), e))
        })?;

        let metrics_path = run_dir.join(METRICS_FILE);
        if metrics_path.exists() {
            return Err(SessionError::Init(format!(
                "{} already holds a run",
                run_dir.display()
            )));
        }

        let config_file = File::create(run_dir.join(CONFIG_FILE))?;
        serde_json::to_writer_pretty(config_file, config)?;

        let metrics_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&metrics_path)?;

        tracing::info!(
            run_dir = %run_dir.display(),
            project = %config.project,
            "Started offline run"
        );

        Ok(OfflineSession {
            run_dir,
            writer: Some(BufWriter::new(metrics_file)),
            summary: Metrics::new(),
            last_step: None,
            rows: 0,
        })
    }
}

/// A run being written by [`OfflineTracker`].
pub struct OfflineSession {
    run_dir: PathBuf,
    writer: Option<BufWriter<File>>,
    summary: Metrics,
    last_step: Option<u64>,
    rows: u64,
}

impl OfflineSession {
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn last_step(&self) -> Option<u64> {
        self.last_step
    }

    /// Number of rows logged so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn is_finished(&self) -> bool {
        self.writer.is_none()
    }
}

impl TrackingSession for OfflineSession {
    fn log(&mut self, metrics: &Metrics, step: Option<u64>) -> Result<(), SessionError> {
        let writer = self.writer.as_mut().ok_or(SessionError::AlreadyFinished)?;

        if let Some(key) = metrics.keys().find(|k| *k == STEP_KEY || *k == ROWS_KEY) {
            return Err(SessionError::ReservedKey(key.clone()));
        }

        let step = match (step, self.last_step) {
            (Some(step), _) => step,
            (None, None) => 0,
            (None, Some(last)) => last
                .checked_add(1)
                .ok_or_else(|| SessionError::Backend("step counter overflowed".into()))?,
        };
        if let Some(last) = self.last_step {
            if step < last {
                tracing::debug!(step, last, "Logging step lower than the last logged step");
            }
        }

        let mut row = Map::new();
        row.insert(STEP_KEY.to_string(), Value::from(step));
        for (key, value) in metrics {
            row.insert(key.clone(), encode(value));
        }

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.summary
            .extend(metrics.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.last_step = Some(step);
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SessionError> {
        let mut writer = self.writer.take().ok_or(SessionError::AlreadyFinished)?;
        writer.flush()?;

        let mut summary = Map::new();
        for (key, value) in &self.summary {
            summary.insert(key.clone(), encode(value));
        }
        summary.insert(STEP_KEY.to_string(), Value::from(self.last_step));
        summary.insert(ROWS_KEY.to_string(), Value::from(self.rows));

        let file = File::create(self.run_dir.join(SUMMARY_FILE))?;
        serde_json::to_writer_pretty(file, &summary)?;

        tracing::info!(
            run_dir = %self.run_dir.display(),
            rows = self.rows,
            "Finished offline run"
        );
        Ok(())
    }
}

/// JSON form of a metric value.
///
/// JSON has no non-finite numbers, so NaN and infinities are written as the
/// strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
fn encode(value: &MetricValue) -> Value {
    match value {
        MetricValue::Int(v) => Value::from(*v),
        MetricValue::Float(v) => encode_float(*v),
        MetricValue::Bool(v) => Value::Bool(*v),
        MetricValue::Text(v) => Value::String(v.clone()),
        MetricValue::Array(values) => {
            Value::Array(values.iter().map(|v| encode_float(*v)).collect())
        }
    }
}

fn encode_float(v: f64) -> Value {
    if v.is_nan() {
        Value::from("NaN")
    } else if v == f64::INFINITY {
        Value::from("Infinity")
    } else if v == f64::NEG_INFINITY {
        Value::from("-Infinity")
    } else {
        Value::from(v)
    }
}

/// Read the summary of a finished run.
pub fn read_summary(run_dir: impl AsRef<Path>) -> Result<Map<String, Value>, SessionError> {
    let file = File::open(run_dir.as_ref().join(SUMMARY_FILE))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read every logged row of a run, in order.
pub fn read_rows(run_dir: impl AsRef<Path>) -> Result<Vec<Map<String, Value>>, SessionError> {
    let file = File::open(run_dir.as_ref().join(METRICS_FILE))?;
    let mut rows = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}

/// Directory name for a run: the sanitized run name, or a timestamped id.
fn run_id(config: &RunConfig) -> String {
    let sanitized: String = config
        .name
        .as_deref()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        use std::time::{SystemTime, UNIX_EPOCH};
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("run-{}-{}", secs, std::process::id())
    } else {
        sanitized
    }
}
