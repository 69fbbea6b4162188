use runlog::prelude::*;
use runlog::RunlogError;
use std::sync::{Arc, Mutex};

/// Everything a stub session saw.
#[derive(Default)]
struct Journal {
    inits: Vec<RunConfig>,
    logged: Vec<(Metrics, Option<u64>)>,
    finishes: usize,
}

struct StubTracker {
    journal: Arc<Mutex<Journal>>,
    fail_init: bool,
}

impl StubTracker {
    fn new() -> (Self, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let tracker = Self {
            journal: journal.clone(),
            fail_init: false,
        };
        (tracker, journal)
    }
}

struct StubSession {
    journal: Arc<Mutex<Journal>>,
    finished: bool,
}

impl Tracker for StubTracker {
    type Session = StubSession;

    fn init(&self, config: &RunConfig) -> Result<StubSession, SessionError> {
        if self.fail_init {
            return Err(SessionError::Init("invalid credentials".into()));
        }
        self.journal.lock().unwrap().inits.push(config.clone());
        Ok(StubSession {
            journal: self.journal.clone(),
            finished: false,
        })
    }
}

impl TrackingSession for StubSession {
    fn log(&mut self, metrics: &Metrics, step: Option<u64>) -> Result<(), SessionError> {
        if self.finished {
            return Err(SessionError::AlreadyFinished);
        }
        self.journal
            .lock()
            .unwrap()
            .logged
            .push((metrics.clone(), step));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SessionError> {
        self.journal.lock().unwrap().finishes += 1;
        if self.finished {
            return Err(SessionError::AlreadyFinished);
        }
        self.finished = true;
        Ok(())
    }
}

fn table(pairs: &[(&str, f64)]) -> TabularInput {
    let table = TabularInput::new();
    for (key, value) in pairs {
        table.record(key, *value);
    }
    table
}

#[test]
fn test_record_then_dump_forwards_once() {
    let (tracker, journal) = StubTracker::new();
    let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();

    let batch = table(&[("loss", 0.5), ("entropy", 0.1)]);
    sink.record(&LogInput::Tabular(batch.clone()), "").unwrap();
    sink.dump(Some(3)).unwrap();

    let journal = journal.lock().unwrap();
    assert_eq!(journal.logged.len(), 1);
    assert_eq!(journal.logged[0].0, batch.as_map());
    assert_eq!(journal.logged[0].1, Some(3));
}

#[test]
fn test_rejected_input_leaves_queue_unchanged() {
    let (tracker, journal) = StubTracker::new();
    let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();

    sink.record(&LogInput::Tabular(table(&[("a", 1.0)])), "").unwrap();
    let before = sink.pending_len();

    let result = sink.record(&LogInput::Text("not a table".into()), "");
    assert!(matches!(
        result,
        Err(RunlogError::UnacceptableType {
            kind: InputKind::Text
        })
    ));
    assert_eq!(sink.pending_len(), before);

    sink.dump(Some(1)).unwrap();
    assert_eq!(journal.lock().unwrap().logged.len(), 1);
}

#[test]
fn test_empty_dump_forwards_nothing() {
    let (tracker, journal) = StubTracker::new();
    let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();

    sink.dump(Some(0)).unwrap();
    sink.dump(None).unwrap();
    assert!(journal.lock().unwrap().logged.is_empty());
}

#[test]
fn test_multiple_records_share_step_in_order() {
    let (tracker, journal) = StubTracker::new();
    let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();

    let batches: Vec<_> = (0..4).map(|i| table(&[("i", i as f64)])).collect();
    for batch in &batches {
        sink.record(&LogInput::Tabular(batch.clone()), "").unwrap();
    }
    sink.dump(Some(9)).unwrap();

    let journal = journal.lock().unwrap();
    assert_eq!(journal.logged.len(), batches.len());
    for (batch, (metrics, step)) in batches.iter().zip(&journal.logged) {
        assert_eq!(metrics, &batch.as_map());
        assert_eq!(*step, Some(9));
    }
    assert_eq!(sink.pending_len(), 0);
}

#[test]
fn test_persist_never_finishes() {
    let (tracker, journal) = StubTracker::new();
    let config = SinkConfig::new(RunConfig::new("p")).persist(true);
    let mut sink = MetricSink::new(&tracker, config).unwrap();

    sink.close().unwrap();
    sink.close().unwrap();
    drop(sink);
    assert_eq!(journal.lock().unwrap().finishes, 0);
}

#[test]
fn test_close_finishes_exactly_once() {
    let (tracker, journal) = StubTracker::new();
    let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();
    assert!(sink.owns_session());

    sink.close().unwrap();
    sink.close().unwrap();
    drop(sink);
    assert_eq!(journal.lock().unwrap().finishes, 1);
}

#[test]
fn test_drop_finishes_unclosed_sink() {
    let (tracker, journal) = StubTracker::new();
    {
        let _sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();
    }
    assert_eq!(journal.lock().unwrap().finishes, 1);
}

#[test]
fn test_adopted_session_is_left_to_caller() {
    let (tracker, journal) = StubTracker::new();
    let session = Arc::new(Mutex::new(tracker.init(&RunConfig::new("p")).unwrap()));
    session.lock().unwrap().finish().unwrap();

    let mut sink = MetricSink::with_session(session.clone(), false);
    assert!(sink.close().is_ok());
    assert_eq!(journal.lock().unwrap().finishes, 1);
}

#[test]
fn test_init_failure_propagates() {
    let (mut tracker, journal) = StubTracker::new();
    tracker.fail_init = true;

    let result = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p")));
    assert!(matches!(
        result,
        Err(RunlogError::Session(SessionError::Init(_)))
    ));
    assert!(journal.lock().unwrap().inits.is_empty());
}

#[test]
fn test_run_config_is_passed_through() {
    let (tracker, journal) = StubTracker::new();
    let run = RunConfig::new("cartpole")
        .name("ppo")
        .tag("sweep")
        .param("lr", 0.001);
    let _sink = MetricSink::new(&tracker, SinkConfig::new(run.clone())).unwrap();

    assert_eq!(journal.lock().unwrap().inits, vec![run]);
}

#[test]
fn test_record_dump_close_scenario() {
    let (tracker, journal) = StubTracker::new();
    let mut sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();

    let batch_a = table(&[("reward", 1.0)]);
    let batch_b = table(&[("reward", 2.0), ("length", 200.0)]);
    sink.record(&LogInput::Tabular(batch_a.clone()), "").unwrap();
    sink.record(&LogInput::Tabular(batch_b.clone()), "").unwrap();
    sink.dump(Some(5)).unwrap();

    {
        let journal = journal.lock().unwrap();
        assert_eq!(
            journal.logged,
            vec![(batch_a.as_map(), Some(5)), (batch_b.as_map(), Some(5))]
        );
    }
    assert_eq!(sink.pending_len(), 0);

    sink.close().unwrap();
    assert_eq!(journal.lock().unwrap().finishes, 1);
}

#[test]
fn test_logger_routes_text_away_from_sink() {
    let (tracker, journal) = StubTracker::new();
    let sink = MetricSink::new(&tracker, SinkConfig::new(RunConfig::new("p"))).unwrap();

    let mut logger = Logger::new();
    logger.add_output(Box::new(sink));
    logger.add_output(Box::new(ConsoleOutput::new()));

    logger.log("starting epoch").unwrap();
    logger.log(table(&[("loss", 0.3)])).unwrap();
    logger.dump_all(Some(1)).unwrap();
    logger.close().unwrap();

    let journal = journal.lock().unwrap();
    assert_eq!(journal.logged.len(), 1);
    assert_eq!(journal.finishes, 1);
}
