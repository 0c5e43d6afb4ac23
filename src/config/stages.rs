// ABOUTME: Ordered stage definitions: stage name mapped to a shell command.
// ABOUTME: Shared by hmd.yml and the pipeline.yml uploaded to the server.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::status::StageList;

/// Stages in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stages(IndexMap<String, String>);

impl Stages {
    /// File the stages are uploaded to inside the remote work tree.
    pub const FILENAME: &'static str = "pipeline.yml";

    pub fn new<I, K, V>(stages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            stages
                .into_iter()
                .map(|(name, cmd)| (name.into(), cmd.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(name, command)` pairs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, cmd)| (name.as_str(), cmd.as_str()))
    }

    /// Stage names for the status tracker.
    pub fn names(&self) -> StageList {
        StageList::new(self.0.keys().cloned())
    }

    /// Require at least one stage and names that fit on a single status line.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.is_empty() {
            return Err("no stages defined".to_string());
        }
        match self.0.keys().find(|name| name.contains(['\n', '\r'])) {
            Some(name) => Err(format!("stage name {name:?} contains a line break")),
            None => Ok(()),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let stages: Self = serde_yaml::from_str(yaml)?;
        stages.validate().map_err(Error::InvalidConfig)?;
        Ok(stages)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

impl Default for Stages {
    fn default() -> Self {
        Self::new([
            ("lint", "cargo clippy"),
            ("test", "cargo test"),
            ("build", "cargo build --release"),
            ("run", "cargo run --release"),
        ])
    }
}
