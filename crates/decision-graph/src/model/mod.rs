//! In-memory decision configuration and its YAML loader.
//!
//! Loading only parses; structural checks (name collisions, dangling factors, cycles) happen
//! when the evaluation graph is built.

use crate::error::LoadError;
use crate::scorers::{InputKind, ScorerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub measures: Vec<Measure>,
    pub metrics: Vec<Metric>,
    /// Metric whose ranking is the answer.
    #[serde(rename = "final")]
    pub final_metric: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fetchers: BTreeMap<String, FetcherSpec>,
}

impl DecisionConfig {
    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|measure| measure.name == name)
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|metric| metric.name == name)
    }
}

/// One source run through one scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub source: String,
    pub scoring: ScorerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub factors: Vec<Factor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub weight: f64,
}

impl Factor {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Declarative fetcher for a source the user table does not carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherSpec {
    /// Look choices up in a reference CSV; relative paths resolve against the config file.
    Csv {
        path: PathBuf,
        key: LookupKey,
        value: String,
        kind: InputKind,
    },
}

/// Reference columns matched against choice names: `key: city` or `key: [city, state]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupKey {
    Column(String),
    Composite(Vec<String>),
}

impl LookupKey {
    pub fn columns(&self) -> Vec<String> {
        match self {
            LookupKey::Column(name) => vec![name.clone()],
            LookupKey::Composite(names) => names.clone(),
        }
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<DecisionConfig, LoadError> {
    let file = std::fs::File::open(path.as_ref())?;
    let config = from_reader(file)?;
    tracing::debug!(
        path = %path.as_ref().display(),
        measures = config.measures.len(),
        metrics = config.metrics.len(),
        "decision configuration loaded"
    );
    Ok(config)
}

/// Scorer and fetcher variants are written as single-key maps (`star: { min: 1, max: 5 }`),
/// not YAML tags.
pub fn from_reader<R: Read>(reader: R) -> Result<DecisionConfig, LoadError> {
    let deserializer = serde_yaml::Deserializer::from_reader(reader);
    Ok(serde_yaml::with::singleton_map_recursive::deserialize(
        deserializer,
    )?)
}

pub fn from_str(text: &str) -> Result<DecisionConfig, LoadError> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    Ok(serde_yaml::with::singleton_map_recursive::deserialize(
        deserializer,
    )?)
}
