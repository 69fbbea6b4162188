//! Run configuration passed to tracking backends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Options for starting a tracking run.
///
/// Outputs never interpret these; they are handed to [`Tracker::init`](super::Tracker::init)
/// as given.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Project the run belongs to
    pub project: String,
    /// Display name of the run
    pub name: Option<String>,
    /// Team or user owning the project
    pub entity: Option<String>,
    /// Group used to organize related runs
    pub group: Option<String>,
    /// Free-form description
    pub notes: Option<String>,
    /// Tags attached to the run
    pub tags: Vec<String>,
    /// Hyperparameters recorded with the run
    pub config: Map<String, Value>,
    /// Directory overriding the backend's default location
    pub dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Record a hyperparameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}
