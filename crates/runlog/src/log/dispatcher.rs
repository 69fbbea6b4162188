//! Logger that dispatches records to multiple outputs.

use super::{InputKind, LogInput, LogOutput};
use crate::Result;

/// Routes records to every registered output that accepts them.
///
/// Records no output accepts are reported on the warning channel
/// (`tracing::warn!`) and otherwise ignored. Errors returned by an output are
/// propagated to the caller unchanged.
pub struct Logger {
    outputs: Vec<Box<dyn LogOutput>>,
    prefixes: Vec<String>,
    warnings_enabled: bool,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
            prefixes: Vec::new(),
            warnings_enabled: true,
        }
    }

    pub fn with_outputs(outputs: Vec<Box<dyn LogOutput>>) -> Self {
        Self {
            outputs,
            ..Self::new()
        }
    }

    pub fn add_output(&mut self, output: Box<dyn LogOutput>) {
        self.outputs.push(output);
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Whether any registered output accepts `kind`.
    pub fn has_output_type(&self, kind: InputKind) -> bool {
        self.outputs
            .iter()
            .any(|output| output.types_accepted().contains(&kind))
    }

    pub fn push_prefix(&mut self, prefix: &str) {
        self.prefixes.push(prefix.to_string());
    }

    pub fn pop_prefix(&mut self) -> Option<String> {
        self.prefixes.pop()
    }

    /// Current prefix passed to outputs.
    pub fn prefix(&self) -> String {
        self.prefixes.concat()
    }

    /// Silence the warning channel.
    pub fn disable_warnings(&mut self) {
        self.warnings_enabled = false;
    }

    /// Log a record to every output that accepts its kind.
    pub fn log(&mut self, data: impl Into<LogInput>) -> Result<()> {
        let data = data.into();
        let kind = data.kind();

        if self.outputs.is_empty() {
            self.warn("No outputs have been added to the logger", kind);
            return Ok(());
        }

        let prefix = self.prefix();
        let mut accepted = false;
        for output in &mut self.outputs {
            if output.types_accepted().contains(&kind) {
                output.record(&data, &prefix)?;
                accepted = true;
            }
        }

        if !accepted {
            self.warn("Log data was not accepted by any output", kind);
        }
        Ok(())
    }

    /// Dump every output, tagging the flush with `step`.
    pub fn dump_all(&mut self, step: Option<u64>) -> Result<()> {
        for output in &mut self.outputs {
            output.dump(step)?;
        }
        Ok(())
    }

    /// Close and remove every output.
    ///
    /// Every output is closed even if an earlier one fails; the first error is
    /// returned.
    pub fn remove_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for mut output in self.outputs.drain(..) {
            if let Err(e) = output.close() {
                tracing::warn!("Failed to close log output: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.remove_all()
    }

    fn warn(&self, msg: &str, kind: InputKind) {
        if self.warnings_enabled {
            tracing::warn!(%kind, "{}", msg);
        }
    }
}
