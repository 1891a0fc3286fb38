//! Key-value run configuration.
//!
//! The model reads a handful of flags and file names at well-defined points of
//! a run (debug output name, whether to print dependency graphs, ...). Values
//! come from a flat JSON object and may be overridden from the command line.
//!
//! ```json
//! {
//!     "xmlDebugFileName": "debug.xml",
//!     "PrintDependencyGraphs": false,
//!     "dependencyGraphName": "graph"
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The configuration document is not a flat JSON object of scalars.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A `key=value` override was malformed.
    #[error("invalid override {0:?}, expected key=value")]
    InvalidOverride(String),
}

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ConfigValue {
    fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Number(n) => Some(*n != 0.0),
            ConfigValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ConfigValue::Number(n) => Some(*n),
            ConfigValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Number(n) => write!(f, "{n}"),
            ConfigValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

/// Flat key-value configuration.
///
/// Lookups never fail: every getter takes the default to use when the key is
/// absent or its value cannot be interpreted as the requested type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, ConfigValue>,
}

impl Configuration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Set a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Apply a `key=value` override. The value is stored as text and
    /// interpreted on lookup.
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = assignment
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidOverride(assignment.to_string()))?;
        self.set(key.trim(), value.trim());
        Ok(())
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Boolean flag lookup.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(ConfigValue::as_bool)
            .unwrap_or(default)
    }

    /// File name lookup.
    pub fn get_file(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(ConfigValue::Text(s)) if !s.is_empty() => s.clone(),
            _ => default.to_string(),
        }
    }

    /// Numeric lookup.
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.values
            .get(key)
            .and_then(ConfigValue::as_f64)
            .unwrap_or(default)
    }

    /// Integer lookup. Fractional values are truncated.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values
            .get(key)
            .and_then(ConfigValue::as_f64)
            .map(|v| v as i64)
            .unwrap_or(default)
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let conf = Configuration::new();
        assert!(!conf.get_bool("PrintDependencyGraphs", false));
        assert!(conf.get_bool("PrintDependencyGraphs", true));
        assert_eq!(conf.get_file("xmlDebugFileName", "debug.xml"), "debug.xml");
        assert_eq!(conf.get_double("tolerance", 0.001), 0.001);
        assert_eq!(conf.get_int("maxEvaluations", 10), 10);
    }

    #[test]
    fn test_from_json() {
        let conf = Configuration::from_json_str(
            r#"{"PrintDependencyGraphs": true, "xmlDebugFileName": "out.xml", "tolerance": 0.01}"#,
        )
        .unwrap();
        assert!(conf.get_bool("PrintDependencyGraphs", false));
        assert_eq!(conf.get_file("xmlDebugFileName", "debug.xml"), "out.xml");
        assert_eq!(conf.get_double("tolerance", 0.001), 0.01);
    }

    #[test]
    fn test_text_values_interpreted_on_lookup() {
        let mut conf = Configuration::new();
        conf.apply_override("PrintSectorDependencies=1").unwrap();
        conf.apply_override("maxEvaluations = 250").unwrap();
        assert!(conf.get_bool("PrintSectorDependencies", false));
        assert_eq!(conf.get_int("maxEvaluations", 0), 250);
        // Not a boolean: falls back to the default.
        conf.set("flag", "maybe");
        assert!(conf.get_bool("flag", true));
    }

    #[test]
    fn test_invalid_override() {
        let mut conf = Configuration::new();
        assert!(matches!(
            conf.apply_override("no-equals-sign"),
            Err(ConfigError::InvalidOverride(_))
        ));
        assert!(conf.apply_override("=value").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Configuration::load("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.json");
        std::fs::write(&path, r#"{"dependencyGraphName": "deps"}"#).unwrap();
        let conf = Configuration::load(&path).unwrap();
        assert_eq!(conf.get_file("dependencyGraphName", "graph"), "deps");
    }
}
