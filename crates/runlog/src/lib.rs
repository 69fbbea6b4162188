//! # runlog
//!
//! Buffered metric outputs for experiment tracking.
//!
//! ## Overview
//!
//! runlog provides:
//! - A small logging façade: the `LogOutput` trait, typed `LogInput` records and
//!   the `Logger` dispatcher that routes records to every registered output
//! - `MetricSink`, an output that buffers tabular batches and forwards them to a
//!   tracking run once the step is known
//! - The `Tracker` / `TrackingSession` contract for tracking backends, with a
//!   file-backed `OfflineTracker`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runlog::prelude::*;
//!
//! # fn main() -> runlog::Result<()> {
//! let tracker = OfflineTracker::new("runs");
//! let config = SinkConfig::new(RunConfig::new("cartpole").name("ppo-baseline"));
//!
//! let mut logger = Logger::new();
//! logger.add_output(Box::new(MetricSink::new(&tracker, config)?));
//!
//! let table = TabularInput::new();
//! table.record("reward", 12.5);
//! logger.log(LogInput::Tabular(table))?;
//! logger.dump_all(Some(1))?;
//! logger.close()?;
//! # Ok(())
//! # }
//! ```

pub mod log;
pub mod sink;
pub mod tracking;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::log::{
        ConsoleOutput, InputKind, LogInput, LogOutput, Logger, MetricValue, TabularInput,
    };
    pub use crate::sink::{MetricSink, SinkConfig};
    pub use crate::tracking::{
        Metrics, OfflineSession, OfflineTracker, RunConfig, SessionError, Tracker,
        TrackingSession,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::log::InputKind;
use crate::tracking::SessionError;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum RunlogError {
    #[error("Unacceptable type: {kind} input is not accepted by this output")]
    UnacceptableType { kind: InputKind },

    #[error("Output is closed")]
    Closed,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = core::result::Result<T, RunlogError>;
