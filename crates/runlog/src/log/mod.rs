//! Logging façade.
//!
//! Provides:
//! - `LogInput` / `TabularInput` record types
//! - `LogOutput` trait for composable outputs
//! - `Logger` for routing records to multiple outputs
//! - `ConsoleOutput` for lightweight stdout logging

mod console;
mod dispatcher;
mod input;
mod output;

pub use console::ConsoleOutput;
pub use dispatcher::Logger;
pub use input::{InputKind, LogInput, MetricValue, TabularInput};
pub use output::LogOutput;
