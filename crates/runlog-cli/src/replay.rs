//! Replay and inspection of offline runs.

use anyhow::{bail, Context, Result};
use runlog::prelude::*;
use runlog::tracking::read_summary;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Project used when neither the config file nor the flags name one.
const DEFAULT_PROJECT: &str = "uncategorized";

/// Field of an input line holding the step.
const STEP_FIELD: &str = "step";

pub struct ReplayOutcome {
    pub run_dir: PathBuf,
    pub rows: u64,
}

/// Load a sink configuration from a JSON file, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SinkConfig> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("invalid config {}", path.display()))
        }
        None => Ok(SinkConfig::default()),
    }
}

/// Replay every line of `input` as one logged step.
pub fn replay(
    input: &Path,
    out: &Path,
    mut config: SinkConfig,
    console: bool,
) -> Result<ReplayOutcome> {
    if config.run.project.is_empty() {
        config.run.project = DEFAULT_PROJECT.to_string();
    }

    let file =
        File::open(input).with_context(|| format!("cannot open input {}", input.display()))?;

    let tracker = OfflineTracker::new(out);
    let sink = MetricSink::new(&tracker, config)?;
    let run_dir = sink.inspect_session(|session| session.run_dir().to_path_buf());

    let mut logger = Logger::new();
    logger.add_output(Box::new(sink));
    if console {
        logger.add_output(Box::new(ConsoleOutput::new()));
    }

    let mut rows = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("line {}: read failed", line_no))?;
        if line.trim().is_empty() {
            continue;
        }

        let (table, step) =
            parse_line(&line, index as u64).with_context(|| format!("line {}", line_no))?;
        logger.log(table)?;
        logger.dump_all(Some(step))?;
        rows += 1;
    }

    logger.close()?;
    tracing::info!(run_dir = %run_dir.display(), rows, "Replay complete");

    Ok(ReplayOutcome { run_dir, rows })
}

/// Parse one input line into a table and its step.
///
/// The step comes from the `step` field, or `default_step` when absent.
fn parse_line(line: &str, default_step: u64) -> Result<(TabularInput, u64)> {
    let mut object: Map<String, Value> =
        serde_json::from_str(line).context("expected a JSON object of metrics")?;

    let step = match object.remove(STEP_FIELD) {
        None => default_step,
        Some(value) => match value.as_u64() {
            Some(step) => step,
            None => bail!("`{}` must be a non-negative integer, got {}", STEP_FIELD, value),
        },
    };

    let table = TabularInput::new();
    for (key, value) in object {
        let value: MetricValue = serde_json::from_value(value)
            .with_context(|| format!("unsupported value for `{}`", key))?;
        table.record(&key, value);
    }
    Ok((table, step))
}

/// Print the summary of a finished run.
pub fn inspect(run_dir: &Path) -> Result<()> {
    let summary = read_summary(run_dir)
        .with_context(|| format!("cannot read summary of {}", run_dir.display()))?;

    println!("Run {}:", run_dir.display());
    for (key, value) in &summary {
        println!("  {}: {}", key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_with_step() {
        let (table, step) = parse_line(r#"{"step": 40, "loss": 0.5, "epoch": 2}"#, 0).unwrap();
        assert_eq!(step, 40);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("epoch"), Some(MetricValue::Int(2)));
        assert!(table.get("step").is_none());
    }

    #[test]
    fn test_parse_line_default_step() {
        let (_, step) = parse_line(r#"{"loss": 0.5}"#, 7).unwrap();
        assert_eq!(step, 7);
    }

    #[test]
    fn test_parse_line_rejects_bad_input() {
        assert!(parse_line("[1, 2]", 0).is_err());
        assert!(parse_line(r#"{"step": -1}"#, 0).is_err());
        assert!(parse_line(r#"{"nested": {"a": 1}}"#, 0).is_err());
    }
}
