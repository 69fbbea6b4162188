//! Experiment-tracking backends.
//!
//! Provides:
//! - `Tracker` / `TrackingSession` traits implemented by tracking clients
//! - `RunConfig` options passed through to run creation
//! - `OfflineTracker` writing runs to local directories

mod config;
mod offline;

pub use config::RunConfig;
pub use offline::{read_rows, read_summary, OfflineSession, OfflineTracker};

use crate::log::MetricValue;
use std::collections::BTreeMap;

/// Metric name to value, as sent to a tracking run.
pub type Metrics = BTreeMap<String, MetricValue>;

/// Errors reported by tracking backends.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to start run: {0}")]
    Init(String),

    #[error("Metric name `{0}` is reserved by the tracking backend")]
    ReservedKey(String),

    #[error("Run has already finished")]
    AlreadyFinished,

    #[error("Tracking backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A live tracking run.
pub trait TrackingSession: Send {
    /// Log a batch of metrics at `step`.
    ///
    /// Backends choose the step themselves when `step` is `None`.
    fn log(&mut self, metrics: &Metrics, step: Option<u64>) -> Result<(), SessionError>;

    /// End the run.
    fn finish(&mut self) -> Result<(), SessionError>;
}

/// Client able to start tracking runs.
pub trait Tracker {
    type Session: TrackingSession;

    /// Start a new run. `config` is passed through untouched.
    fn init(&self, config: &RunConfig) -> Result<Self::Session, SessionError>;
}
