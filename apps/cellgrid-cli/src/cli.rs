use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "cellgrid",
    about = "Inspect and edit comma-delimited grid files through the concurrent grid",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(flatten)]
    pub grid: GridArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        global = true,
        value_enum,
        env = "CELLGRID_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        value_name = "PATH",
        env = "CELLGRID_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct GridArgs {
    #[arg(
        long = "config",
        global = true,
        value_name = "PATH",
        env = "CELLGRID_CONFIG",
        help = "TOML file with rows, cols and concurrency defaults"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "concurrency",
        global = true,
        value_name = "UNITS",
        allow_negative_numbers = true,
        help = "Upper bound on lock units; 0 or less sizes to the hardware"
    )]
    pub concurrency: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a blank grid file
    New(NewArgs),
    /// Print a grid file with row and column numbers
    Show(FileArgs),
    /// Print one cell
    Get(CellArgs),
    /// Overwrite one cell and save
    Set(SetArgs),
    /// Print the first cell holding VALUE, row-major
    Search(SearchArgs),
    /// Insert a blank row and save
    InsertRow(InsertArgs),
    /// Insert a blank column and save
    InsertColumn(InsertArgs),
    /// Swap two rows and save
    SwapRows(SwapArgs),
    /// Swap two columns and save
    SwapColumns(SwapArgs),
    /// Hammer an in-memory grid from several threads and report throughput
    Stress(StressArgs),
}

#[derive(Args, Debug)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct NewArgs {
    pub file: PathBuf,
    #[arg(long, help = "Row count (falls back to config / CELLGRID_ROWS)")]
    pub rows: Option<usize>,
    #[arg(long, help = "Column count (falls back to config / CELLGRID_COLS)")]
    pub cols: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CellArgs {
    pub file: PathBuf,
    pub row: usize,
    pub col: usize,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub file: PathBuf,
    pub row: usize,
    pub col: usize,
    pub value: String,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub file: PathBuf,
    pub value: String,
}

#[derive(Args, Debug)]
pub struct InsertArgs {
    pub file: PathBuf,
    #[arg(
        long,
        value_name = "INDEX",
        help = "Insert after this index; omit to insert before the first"
    )]
    pub after: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SwapArgs {
    pub file: PathBuf,
    pub a: usize,
    pub b: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StressArgs {
    #[arg(long, default_value_t = 64)]
    pub rows: usize,
    #[arg(long, default_value_t = 64)]
    pub cols: usize,
    #[arg(long, default_value_t = 8)]
    pub threads: usize,
    #[arg(long = "ops", default_value_t = 100_000, help = "Operations per thread")]
    pub ops_per_thread: usize,
    #[arg(
        long = "structural-every",
        default_value_t = 5_000,
        help = "Insert a row or column every N operations per thread (0 disables)"
    )]
    pub structural_every: usize,
    #[arg(long, help = "Seed for the per-thread RNGs")]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn insert_without_after_targets_front() {
        let cli = Cli::try_parse_from(["cellgrid", "insert-row", "grid.csv"]).unwrap();
        match cli.command {
            Command::InsertRow(args) => assert_eq!(args.after, None),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn negative_concurrency_parses() {
        let cli =
            Cli::try_parse_from(["cellgrid", "--concurrency", "-1", "show", "g.csv"]).unwrap();
        assert_eq!(cli.grid.concurrency, Some(-1));
    }
}
