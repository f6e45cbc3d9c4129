use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const FILTER_VAR: &str = "CELLGRID_LOG_FILTER";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(config: &LogConfig) -> Result<(), InitError> {
    if GUARD.get().is_some() {
        return Ok(());
    }

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| InitError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(config.level))
        .with_level(true)
        .with_target(config.level >= LogLevel::Debug)
        .with_thread_ids(config.level >= LogLevel::Trace)
        .with_thread_names(config.level >= LogLevel::Trace)
        .with_ansi(config.file.is_none())
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| InitError::Configure(err.to_string()))?;

    let _ = GUARD.set(guard);
    Ok(())
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    match std::env::var(FILTER_VAR) {
        Ok(filter) if !filter.trim().is_empty() => EnvFilter::new(filter),
        _ => EnvFilter::new(default_filter_for(level.to_filter())),
    }
}

/// Verbose levels apply to our own crates only.
fn default_filter_for(level: LevelFilter) -> String {
    match level {
        LevelFilter::TRACE => "info,cellgrid=trace,cellgrid_cli=trace".to_owned(),
        LevelFilter::DEBUG => "info,cellgrid=debug,cellgrid_cli=debug".to_owned(),
        other => other.to_string().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_levels_scope_to_workspace_crates() {
        assert_eq!(
            default_filter_for(LevelFilter::DEBUG),
            "info,cellgrid=debug,cellgrid_cli=debug"
        );
        assert_eq!(default_filter_for(LevelFilter::WARN), "warn");
        assert_eq!(default_filter_for(LevelFilter::OFF), "off");
    }

    #[test]
    fn levels_are_ordered_by_verbosity() {
        assert!(LogLevel::Trace > LogLevel::Debug);
        assert!(LogLevel::Warn > LogLevel::Error);
        assert_eq!(LogLevel::default().to_filter(), LevelFilter::WARN);
    }
}
