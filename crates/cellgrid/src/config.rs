use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::partition::ConcurrencyBudget;

pub const ROWS_VAR: &str = "CELLGRID_ROWS";
pub const COLS_VAR: &str = "CELLGRID_COLS";
pub const CONCURRENCY_VAR: &str = "CELLGRID_CONCURRENCY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidVar { var: &'static str, value: String },
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Initial grid shape and lock budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    /// Upper bound on lock units; `<= 0` sizes to the hardware.
    pub concurrency: i64,
}

impl GridConfig {
    pub fn budget(&self) -> ConcurrencyBudget {
        ConcurrencyBudget::from_raw(self.concurrency)
    }

    /// Load configuration from environment variables, defaulting to an empty
    /// grid with an automatic budget.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| env::var(var).ok())
    }

    /// Read a TOML file with optional `rows`, `cols` and `concurrency` keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace fields for which `lookup` yields a value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rows) = parse_var(&lookup, ROWS_VAR)? {
            self.rows = rows;
        }
        if let Some(cols) = parse_var(&lookup, COLS_VAR)? {
            self.cols = cols;
        }
        if let Some(concurrency) = parse_var(&lookup, CONCURRENCY_VAR)? {
            self.concurrency = concurrency;
        }
        Ok(self)
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| env::var(var).ok())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidVar { var, value })
}
