//! Output forwarding tabular batches to a tracking run.
//!
//! `MetricSink` buffers every tabular record it receives and sends the batches
//! to its [`TrackingSession`] when the logger dumps, since only then is the
//! step known.

use crate::log::{InputKind, LogInput, LogOutput, TabularInput};
use crate::tracking::{RunConfig, SessionError, Tracker, TrackingSession};
use crate::{Result, RunlogError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

const ACCEPTED: [InputKind; 1] = [InputKind::Tabular];

/// Configuration for a sink that starts its own run.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    /// Keep the run open when the sink is closed
    pub persist: bool,
    /// Options passed to the tracker when starting the run
    pub run: RunConfig,
}

impl SinkConfig {
    pub fn new(run: RunConfig) -> Self {
        Self {
            persist: false,
            run,
        }
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

/// Who may finish the run.
enum SessionHandle<S> {
    /// Started by the sink.
    Owned(S),
    /// Supplied by the caller, who keeps responsibility for finishing it.
    Adopted(Arc<Mutex<S>>),
}

/// A batch waiting for the next dump.
///
/// Holds the caller's table handle, so the values sent are the ones present at
/// flush time.
struct PendingRecord {
    batch: TabularInput,
}

impl PendingRecord {
    fn flush<S: TrackingSession>(
        &self,
        session: &mut S,
        step: Option<u64>,
    ) -> std::result::Result<(), SessionError> {
        session.log(&self.batch.as_map(), step)
    }
}

/// Log output that forwards tabular batches to a tracking run.
///
/// Only tabular inputs are accepted; anything else is rejected with
/// [`RunlogError::UnacceptableType`]. Batches are queued by `record` and sent
/// in order by `dump`, all tagged with the dump's step. The record prefix does
/// not affect metric names.
///
/// The run is finished on `close` (or drop) when the sink started it and
/// `persist` is false. A caller-supplied session is never finished.
///
/// # Example
///
/// ```no_run
/// use runlog::prelude::*;
///
/// # fn main() -> runlog::Result<()> {
/// let tracker = OfflineTracker::new("runs");
/// let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("demo")))?;
///
/// let table = TabularInput::new();
/// table.record("loss", 0.42);
/// sink.record(&LogInput::Tabular(table), "")?;
/// sink.dump(Some(100))?;
/// sink.close()?;
/// # Ok(())
/// # }
/// ```
pub struct MetricSink<S: TrackingSession> {
    session: SessionHandle<S>,
    persist: bool,
    pending: Vec<PendingRecord>,
    closed: bool,
}

impl<S: TrackingSession> MetricSink<S> {
    /// Start a new run with `tracker` and own it.
    pub fn new<T>(tracker: &T, config: SinkConfig) -> Result<Self>
    where
        T: Tracker<Session = S>,
    {
        let session = tracker.init(&config.run)?;
        Ok(Self::from_handle(SessionHandle::Owned(session), config.persist))
    }

    /// Log to a session owned by the caller.
    ///
    /// The sink never finishes an adopted session; `persist` has no further
    /// effect in that case.
    pub fn with_session(session: Arc<Mutex<S>>, persist: bool) -> Self {
        Self::from_handle(SessionHandle::Adopted(session), persist)
    }

    fn from_handle(session: SessionHandle<S>, persist: bool) -> Self {
        Self {
            session,
            persist,
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Number of batches waiting for the next dump.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn owns_session(&self) -> bool {
        matches!(self.session, SessionHandle::Owned(_))
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run `f` against the session, owned or adopted.
    pub fn inspect_session<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        match &self.session {
            SessionHandle::Owned(session) => f(session),
            SessionHandle::Adopted(shared) => {
                let guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
                f(&*guard)
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(RunlogError::Closed)
        } else {
            Ok(())
        }
    }

    /// Send queued batches in order. Stops at the first failure, leaving the
    /// failed batch and everything after it queued.
    fn flush_pending(&mut self, step: Option<u64>) -> std::result::Result<usize, SessionError> {
        let pending = std::mem::take(&mut self.pending);
        let mut sent = 0;
        let mut failure = None;

        {
            let mut guard;
            let session: &mut S = match &mut self.session {
                SessionHandle::Owned(session) => session,
                SessionHandle::Adopted(shared) => {
                    guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
                    &mut *guard
                }
            };

            for record in &pending {
                if let Err(e) = record.flush(session, step) {
                    failure = Some(e);
                    break;
                }
                sent += 1;
            }
        }

        match failure {
            Some(e) => {
                self.pending = pending.into_iter().skip(sent).collect();
                Err(e)
            }
            None => Ok(sent),
        }
    }
}

impl<S: TrackingSession> LogOutput for MetricSink<S> {
    fn types_accepted(&self) -> &[InputKind] {
        &ACCEPTED
    }

    fn record(&mut self, data: &LogInput, _prefix: &str) -> Result<()> {
        self.ensure_open()?;
        match data {
            LogInput::Tabular(batch) => {
                self.pending.push(PendingRecord {
                    batch: batch.clone(),
                });
                Ok(())
            }
            other => Err(RunlogError::UnacceptableType { kind: other.kind() }),
        }
    }

    fn dump(&mut self, step: Option<u64>) -> Result<()> {
        self.ensure_open()?;
        if self.pending.is_empty() {
            return Ok(());
        }
        let sent = self.flush_pending(step)?;
        tracing::debug!(step, records = sent, "Dumped tabular records");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if !self.pending.is_empty() {
            tracing::warn!(
                records = self.pending.len(),
                "Closing metric sink with records that were never dumped"
            );
        }

        if self.persist {
            return Ok(());
        }

        match &mut self.session {
            SessionHandle::Owned(session) => match session.finish() {
                Ok(()) | Err(SessionError::AlreadyFinished) => Ok(()),
                Err(e) => Err(e.into()),
            },
            SessionHandle::Adopted(_) => Ok(()),
        }
    }
}

impl<S: TrackingSession> Drop for MetricSink<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close metric sink: {}", e);
        }
    }
}
