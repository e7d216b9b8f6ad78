//! Core data model for the collection pipeline.
//!
//! A [`Sample`] is a single named measurement, a [`Collection`] is the
//! immutable outcome of one collection pass (samples in collector order plus
//! one [`CollectorError`] per failed collector).

pub mod registry;
pub mod runner;

pub use registry::{CollectorRegistry, RegistryError};
pub use runner::Runner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single measurement produced by a collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    /// Unit string, e.g. `celsius`, `bytes`, `percent`. May be empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Collection time. Collectors may leave this unset; the runner stamps
    /// unset timestamps with the time of the pass.
    #[serde(rename = "ts", default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl Sample {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: String::new(),
            timestamp: None,
            labels: HashMap::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Label lookup returning `None` for absent keys.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Attribution record for one failed collector invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorError {
    #[serde(rename = "collector")]
    pub collector_id: String,
    #[serde(rename = "error")]
    pub message: String,
}

/// Outcome of one collection pass. Snapshot semantics: once returned by the
/// runner it is never mutated, only cloned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    pub samples: Vec<Sample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CollectorError>,
}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_builder_sets_fields() {
        let s = Sample::new("cpu_temperature", 48.2)
            .with_unit("celsius")
            .with_label("source", "sysfs");
        assert_eq!(s.name, "cpu_temperature");
        assert_eq!(s.value, 48.2);
        assert_eq!(s.unit, "celsius");
        assert_eq!(s.label("source"), Some("sysfs"));
        assert_eq!(s.label("missing"), None);
        assert!(s.timestamp.is_none());
    }

    #[test]
    fn sample_serde_omits_empty_unit_and_labels() {
        let s = Sample::new("x", 1.0).with_timestamp(Utc::now());
        let json = serde_json::to_value(&s).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("unit"));
        assert!(!obj.contains_key("labels"));
        assert!(obj.contains_key("ts"));
    }

    #[test]
    fn collection_serde_omits_empty_errors() {
        let c = Collection {
            samples: vec![Sample::new("x", 1.0)],
            errors: Vec::new(),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert!(!json.as_object().unwrap().contains_key("errors"));
    }
}
