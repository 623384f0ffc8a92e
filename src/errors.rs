// src/errors.rs

//! Crate-wide error type.
//!
//! Only configuration loading is allowed to fail the whole process. Everything
//! that goes wrong while analysing a run is scoped to one (run, pipeline) pair
//! and surfaces as a logged outcome instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A pipeline parameter could not be resolved from the run being analysed.
    #[error("cannot resolve parameter '{parameter}' for pipeline '{pipeline}': {reason}")]
    ParameterResolution {
        pipeline: String,
        parameter: String,
        reason: String,
    },

    /// The scoped working directory for an attempt could not be created.
    #[error("cannot set up work dir {path:?}: {reason}")]
    Setup { path: PathBuf, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunwatchError>;
