//! Console logging output.

use super::{InputKind, LogInput, LogOutput, MetricValue};
use crate::Result;
use std::collections::BTreeMap;

const ACCEPTED: [InputKind; 2] = [InputKind::Tabular, InputKind::Text];

/// Output that prints records to stdout via tracing.
///
/// Text is emitted as soon as it is recorded. Tabular values are collected and
/// emitted as a single line per dump.
#[derive(Default)]
pub struct ConsoleOutput {
    table: BTreeMap<String, MetricValue>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the pending table as a single line.
    fn format_line(&self, step: Option<u64>) -> String {
        let mut output = match step {
            Some(step) => format!("Step {}: ", step),
            None => String::new(),
        };

        for (i, (key, value)) in self.table.iter().enumerate() {
            if i > 0 {
                output.push_str(", ");
            }
            output.push_str(&format!("{}={}", key, value));
        }
        output
    }
}

impl LogOutput for ConsoleOutput {
    fn types_accepted(&self) -> &[InputKind] {
        &ACCEPTED
    }

    fn record(&mut self, data: &LogInput, prefix: &str) -> Result<()> {
        match data {
            LogInput::Text(text) => tracing::info!("{}{}", prefix, text),
            LogInput::Tabular(table) => {
                for (key, value) in table.as_map() {
                    self.table.insert(format!("{}{}", prefix, key), value);
                }
            }
        }
        Ok(())
    }

    fn dump(&mut self, step: Option<u64>) -> Result<()> {
        if self.table.is_empty() {
            return Ok(());
        }
        tracing::info!("{}", self.format_line(step));
        self.table.clear();
        Ok(())
    }
}
