//! Record types accepted by log outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A single metric value.
///
/// Serialized untagged, so a value is written as a plain JSON number, bool,
/// string or array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    // Int is tried before Float so whole JSON numbers stay integers.
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Array(Vec<f64>),
}

impl MetricValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            MetricValue::Text(_) | MetricValue::Array(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{:.4}", v),
            MetricValue::Bool(v) => write!(f, "{}", v),
            MetricValue::Text(v) => write!(f, "{}", v),
            MetricValue::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:.4}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(v as f64)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int(v as i64)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        MetricValue::Int(v as i64)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<Vec<f64>> for MetricValue {
    fn from(v: Vec<f64>) -> Self {
        MetricValue::Array(v)
    }
}

#[derive(Debug, Default)]
struct Table {
    values: BTreeMap<String, MetricValue>,
    prefixes: Vec<String>,
}

/// Shared handle to a key/value table of metrics.
///
/// Cloning the handle does not copy the table: every clone sees the same
/// values. Outputs that buffer a `TabularInput` therefore observe writes made
/// after the record call, up to the moment they flush.
#[derive(Clone, Debug, Default)]
pub struct TabularInput {
    inner: Arc<Mutex<Table>>,
}

impl TabularInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a value under `key`, prefixed by the current prefix stack.
    pub fn record(&self, key: &str, value: impl Into<MetricValue>) {
        let mut table = self.table();
        let full_key = format!("{}{}", table.prefixes.concat(), key);
        table.values.insert(full_key, value.into());
    }

    /// Push a prefix applied to subsequently recorded keys.
    pub fn push_prefix(&self, prefix: &str) {
        self.table().prefixes.push(prefix.to_string());
    }

    /// Pop the innermost prefix.
    pub fn pop_prefix(&self) -> Option<String> {
        self.table().prefixes.pop()
    }

    /// Snapshot of the table as a sorted map.
    pub fn as_map(&self) -> BTreeMap<String, MetricValue> {
        self.table().values.clone()
    }

    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.table().values.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().values.is_empty()
    }

    /// Remove all values. Prefixes are kept.
    pub fn clear(&self) {
        self.table().values.clear();
    }

    /// Whether two handles refer to the same table.
    pub fn ptr_eq(&self, other: &TabularInput) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Kind of a [`LogInput`], used by outputs to declare what they accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    Tabular,
    Text,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Tabular => write!(f, "tabular"),
            InputKind::Text => write!(f, "text"),
        }
    }
}

/// A record passed through the logger.
#[derive(Clone, Debug)]
pub enum LogInput {
    Tabular(TabularInput),
    Text(String),
}

impl LogInput {
    pub fn kind(&self) -> InputKind {
        match self {
            LogInput::Tabular(_) => InputKind::Tabular,
            LogInput::Text(_) => InputKind::Text,
        }
    }
}

impl From<TabularInput> for LogInput {
    fn from(table: TabularInput) -> Self {
        LogInput::Tabular(table)
    }
}

impl From<&str> for LogInput {
    fn from(text: &str) -> Self {
        LogInput::Text(text.to_string())
    }
}

impl From<String> for LogInput {
    fn from(text: String) -> Self {
        LogInput::Text(text)
    }
}
