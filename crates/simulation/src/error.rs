//! Error types for the simulation crate.

use std::io;
use std::path::PathBuf;

use marketplace::MarketplaceError;
use technologies::TechnologyError;
use thiserror::Error;

/// Errors that stop a scenario before or between runs.
///
/// Non-convergence and auxiliary output failures are not errors: the first
/// is recorded in the [`RunSummary`](crate::RunSummary), the second logged.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario has no world")]
    MissingWorld,

    #[error("scenario has no model time")]
    MissingModeltime,

    #[error("scenario has already been run")]
    AlreadyCompleted,

    #[error("sector {region}:{sector} uses '{good}', which no market supplies")]
    UnknownInputGood {
        region: String,
        sector: String,
        good: String,
    },

    #[error("technology setup failed in {region}:{sector}")]
    Technology {
        region: String,
        sector: String,
        #[source]
        source: TechnologyError,
    },

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),
}

/// Errors reading scenario input documents.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid technology in {region}:{sector}")]
    Technology {
        region: String,
        sector: String,
        #[source]
        source: TechnologyError,
    },

    #[error("emissions artifact line {line}: {reason}")]
    EmissionsParse { line: usize, reason: String },
}

/// Errors from a climate model run.
#[derive(Debug, Error)]
pub enum ClimateError {
    #[error("climate model '{model}' failed: {reason}")]
    Model { model: String, reason: String },
}

/// Result type for scenario operations.
pub type Result<T> = std::result::Result<T, ScenarioError>;
