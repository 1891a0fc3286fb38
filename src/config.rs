//! Run configuration assembled from the config file, CLI flags and
//! environment.
//!
//! Precedence, lowest first: config file, `--set key=value` overrides, the
//! dedicated flags (`--output-dir`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use types::Configuration;

/// Everything the binary needs to set up one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Inputs
    // ─────────────────────────────────────────────────────────────────────────
    /// Base scenario document followed by add-ons, applied in order.
    pub scenario_files: Vec<PathBuf>,
    /// JSON object of configuration values.
    pub config_file: Option<PathBuf>,
    /// `key=value` assignments applied over the config file.
    pub overrides: Vec<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────────
    /// Directory for every output file.
    pub output_dir: Option<PathBuf>,
    /// Inserted before the extension of every output file name.
    pub file_name_ending: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Climate
    // ─────────────────────────────────────────────────────────────────────────
    /// Warming per unit of cumulative emissions; `None` runs no climate model.
    pub climate_response: Option<f64>,
    /// Gas the climate model integrates.
    pub climate_gas: String,
}

impl RunConfig {
    /// Build the model configuration.
    pub fn configuration(&self) -> Result<Configuration> {
        let mut config = match &self.config_file {
            Some(path) => Configuration::load(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?,
            None => Configuration::new(),
        };
        for assignment in &self.overrides {
            config
                .apply_override(assignment)
                .with_context(|| format!("invalid override '{assignment}'"))?;
        }
        if let Some(dir) = &self.output_dir {
            config.set("outputDirectory", dir.display().to_string());
        }
        Ok(config)
    }
}
