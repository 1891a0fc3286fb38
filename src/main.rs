//! iamodel - Main binary
//!
//! Loads a scenario (a base document plus optional add-ons), runs every model
//! period and reports which periods failed to converge.
//!
//! ```text
//! scenario.json [add-on.json ...] ──► Scenario ──► debug.xml, emissions.csv,
//! config.json + --set overrides  ──►    run    ──► graphs, climate response
//! ```
//!
//! The process exits with status 2 when any period is unsolved and 1 on a
//! setup error.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use simulation::{
    CumulativeEmissionsClimate, RunSummary, Scenario, ScenarioInput, SolverMetricsHook,
};
use tracing::{error, info};

pub use config::RunConfig;

/// Multi-period market equilibrium model
#[derive(Parser, Debug)]
#[command(name = "iamodel")]
#[command(about = "Multi-period market equilibrium model with rotation-delayed land supply")]
#[command(version)]
struct Args {
    /// Base scenario document followed by add-ons
    #[arg(required = true)]
    scenario: Vec<PathBuf>,

    /// Configuration file (JSON object of key/value pairs)
    #[arg(long, env = "IAMODEL_CONFIG")]
    config: Option<PathBuf>,

    /// Override a configuration value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Directory for output files
    #[arg(long, env = "IAMODEL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Suffix inserted before the extension of output file names
    #[arg(long, default_value = "")]
    file_name_ending: String,

    /// Run the cumulative-emissions climate model with this response
    #[arg(long, env = "IAMODEL_CLIMATE_RESPONSE")]
    climate_response: Option<f64>,

    /// Gas integrated by the climate model
    #[arg(long, default_value = "CO2")]
    climate_gas: String,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        Self {
            scenario_files: args.scenario,
            config_file: args.config,
            overrides: args.overrides,
            output_dir: args.output_dir,
            file_name_ending: args.file_name_ending,
            climate_response: args.climate_response,
            climate_gas: args.climate_gas,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let run_config = RunConfig::from(Args::parse());
    match run(&run_config) {
        Ok(summary) if summary.all_solved => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(run_config: &RunConfig) -> Result<RunSummary> {
    let configuration = run_config.configuration()?;
    let mut scenario = Scenario::new("scenario", configuration);

    for path in &run_config.scenario_files {
        let input = ScenarioInput::load(path)?;
        scenario
            .apply_input(&input)
            .with_context(|| format!("failed to build scenario from {}", path.display()))?;
        info!("Read scenario document {}", path.display());
    }

    if let Some(response) = run_config.climate_response {
        let climate = CumulativeEmissionsClimate::new(run_config.climate_gas.clone(), response);
        scenario = scenario.with_climate_model(Box::new(climate));
    }

    let metrics = Arc::new(SolverMetricsHook::new());
    scenario.add_hook(metrics.clone());

    let summary = scenario
        .run(&run_config.file_name_ending)
        .with_context(|| format!("scenario '{}' failed", scenario.name()))?;

    // Print run summary
    let stats = metrics.snapshot();
    eprintln!("╔═══════════════════════════════════════════════════════════════╗");
    eprintln!("║  Scenario: {:<51}║", summary.scenario);
    eprintln!("╠═══════════════════════════════════════════════════════════════╣");
    eprintln!(
        "║  Periods: {:4}  │  Evaluations: {:8}  │  Avg: {:8.1}     ║",
        summary.periods, stats.total_evaluations, stats.avg_evaluations_per_period
    );
    eprintln!(
        "║  Unsolved: {:<51}║",
        if summary.all_solved {
            "none".to_string()
        } else {
            format!("{:?}", summary.unsolved_periods)
        }
    );
    if let Some(year) = scenario.modeltime().map(|mt| mt.end_year()) {
        if let Some(temperature) = scenario.climate_model().temperature(year) {
            eprintln!("║  Temperature {year}: {temperature:<45.3}║");
        }
    }
    eprintln!("╚═══════════════════════════════════════════════════════════════╝");

    Ok(summary)
}
