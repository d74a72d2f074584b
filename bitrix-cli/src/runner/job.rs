//! Job files: shared defaults plus per-record parameter overrides

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::params::ParamSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Parameters shared by every record
    #[serde(default)]
    pub defaults: Map<String, Value>,
    /// Per-record overrides; an empty list runs a single record of defaults
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
    #[serde(default)]
    pub continue_on_fail: Option<bool>,
}

impl Job {
    /// Load a job from TOML or JSON, picked by file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file: {}", path.display()))?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse TOML job: {}", path.display()))
        } else {
            Self::from_json(&content)
                .with_context(|| format!("Failed to parse JSON job: {}", path.display()))
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(content)?;
        // via serde_json so nested tables become plain JSON objects
        let json = serde_json::to_value(value)?;
        Ok(serde_json::from_value(json)?)
    }

    /// Number of records the job runs
    pub fn item_count(&self) -> usize {
        self.records.len().max(1)
    }
}

impl ParamSource for Job {
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value> {
        self.records
            .get(item_index)
            .and_then(|record| record.get(name))
            .or_else(|| self.defaults.get(name))
            .cloned()
    }
}
