use std::io;

use cellgrid::GridError;
use cellgrid::config::ConfigError;
use thiserror::Error;

use crate::logging::InitError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Grid(#[from] GridError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
    #[error("no cell holds {value:?}")]
    NotFound { value: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("stress run failed: {0}")]
    Stress(String),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => 1,
            CliError::InvalidArgument(_) => 2,
            CliError::Grid(err) if err.is_out_of_range() => 2,
            _ => 3,
        }
    }
}
