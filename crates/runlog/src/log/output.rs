//! Output trait implemented by every log destination.

use super::{InputKind, LogInput};
use crate::Result;

/// Trait for outputs registered with a [`Logger`](super::Logger).
///
/// The logger only routes inputs whose kind appears in `types_accepted`, but
/// outputs still validate what they receive in `record`.
pub trait LogOutput: Send {
    /// Kinds of input this output accepts.
    fn types_accepted(&self) -> &[InputKind];

    /// Pass a record to this output.
    ///
    /// `prefix` is the logger's current prefix; text outputs place it before
    /// each entry.
    fn record(&mut self, data: &LogInput, prefix: &str) -> Result<()>;

    /// Flush everything recorded since the last dump, tagged with `step`.
    fn dump(&mut self, _step: Option<u64>) -> Result<()> {
        Ok(())
    }

    /// Release any resources held by the output.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
