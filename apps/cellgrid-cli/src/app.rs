use std::io::Write;
use std::path::Path;

use cellgrid::{CellStore, ConcurrentGrid, GridConfig};
use tracing::{debug, info};

use crate::cli::{Cli, Command, GridArgs};
use crate::error::CliError;
use crate::stress;

pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let config = grid_config(&cli.grid)?;
    debug!(target: "cellgrid_cli", ?config, "resolved grid config");

    match cli.command {
        Command::New(args) => {
            let rows = args.rows.unwrap_or(config.rows);
            let cols = args.cols.unwrap_or(config.cols);
            let grid = ConcurrentGrid::with_budget(rows, cols, config.budget());
            grid.save(&args.file)?;
            info!(target: "cellgrid_cli", file = ?args.file, rows, cols, "created grid");
            writeln!(out, "created {rows}x{cols} grid at {}", args.file.display())?;
        }
        Command::Show(args) => {
            let grid = open(&args.file, &config)?;
            render(&grid.snapshot(), out)?;
        }
        Command::Get(args) => {
            let grid = open(&args.file, &config)?;
            writeln!(out, "{}", grid.get_cell(args.row, args.col)?)?;
        }
        Command::Set(args) => {
            let grid = open(&args.file, &config)?;
            grid.set_cell(args.row, args.col, args.value)?;
            grid.save(&args.file)?;
        }
        Command::Search(args) => {
            let grid = open(&args.file, &config)?;
            let pos = grid
                .search_string(&args.value)
                .ok_or(CliError::NotFound { value: args.value })?;
            writeln!(out, "{} {}", pos.row, pos.col)?;
        }
        Command::InsertRow(args) => {
            let grid = open(&args.file, &config)?;
            grid.insert_row(args.after)?;
            grid.save(&args.file)?;
        }
        Command::InsertColumn(args) => {
            let grid = open(&args.file, &config)?;
            grid.insert_column(args.after)?;
            grid.save(&args.file)?;
        }
        Command::SwapRows(args) => {
            let grid = open(&args.file, &config)?;
            grid.exchange_row(args.a, args.b)?;
            grid.save(&args.file)?;
        }
        Command::SwapColumns(args) => {
            let grid = open(&args.file, &config)?;
            grid.exchange_column(args.a, args.b)?;
            grid.save(&args.file)?;
        }
        Command::Stress(args) => {
            let report = stress::run(&args, config.budget())?;
            report.write_to(out)?;
        }
    }
    Ok(())
}

/// Config file (if any), then `CELLGRID_*` variables, then flags.
pub fn grid_config(args: &GridArgs) -> Result<GridConfig, CliError> {
    let base = match &args.config {
        Some(path) => GridConfig::load(path)?,
        None => GridConfig::default(),
    };
    let mut config = base.with_env_overrides()?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    Ok(config)
}

fn open(path: &Path, config: &GridConfig) -> Result<ConcurrentGrid, CliError> {
    let grid = ConcurrentGrid::with_budget(0, 0, config.budget());
    grid.load(path)?;
    let (rows, cols) = grid.dims();
    debug!(
        target: "cellgrid_cli",
        file = ?path,
        rows,
        cols,
        units = grid.unit_count(),
        "opened grid"
    );
    Ok(grid)
}

fn render<W: Write>(store: &CellStore, out: &mut W) -> std::io::Result<()> {
    let (rows, cols) = store.dims();
    let label_width = rows.saturating_sub(1).to_string().len();
    let mut widths: Vec<usize> = (0..cols).map(|col| col.to_string().len()).collect();
    for row in store.iter_rows() {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    write!(out, "{:label_width$}", "")?;
    for (col, &width) in widths.iter().enumerate() {
        write!(out, " | {col:<width$}")?;
    }
    writeln!(out)?;
    for (row, values) in store.iter_rows().enumerate() {
        write!(out, "{row:>label_width$}")?;
        for (value, &width) in values.iter().zip(&widths) {
            write!(out, " | {value:<width$}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn run_args(args: &[&str]) -> Result<String, CliError> {
        let cli = Cli::try_parse_from(std::iter::once("cellgrid").chain(args.iter().copied()))
            .expect("valid arguments");
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn edit_session_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let file = path.to_str().unwrap();

        run_args(&["new", file, "--rows", "3", "--cols", "3"]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), ",,\n,,\n,,\n");

        run_args(&["set", file, "1", "1", "X"]).unwrap();
        assert_eq!(run_args(&["search", file, "X"]).unwrap(), "1 1\n");

        run_args(&["insert-row", file, "--after", "0"]).unwrap();
        assert_eq!(run_args(&["search", file, "X"]).unwrap(), "2 1\n");
        assert_eq!(run_args(&["get", file, "2", "1"]).unwrap(), "X\n");

        run_args(&["swap-columns", file, "1", "0"]).unwrap();
        assert_eq!(run_args(&["get", file, "2", "0"]).unwrap(), "X\n");

        run_args(&["swap-rows", file, "2", "0"]).unwrap();
        run_args(&["insert-column", file]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            ",X,,\n,,,\n,,,\n,,,\n"
        );
    }

    #[test]
    fn search_miss_and_bad_index_report_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        fs::write(&path, "a,b\nc,d\n").unwrap();
        let file = path.to_str().unwrap();

        let err = run_args(&["search", file, "zzz"]).unwrap_err();
        assert!(matches!(err, CliError::NotFound { .. }));
        let err = run_args(&["get", file, "5", "0"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn show_aligns_columns() {
        let store = CellStore::from_rows([["a", "long"], ["", "b"]]);
        let mut out = Vec::new();
        render(&store, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "  | 0 | 1   \n0 | a | long\n1 |   | b   \n"
        );
    }

    #[test]
    fn flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cellgrid.toml");
        fs::write(&path, "rows = 2\ncols = 5\nconcurrency = 3\n").unwrap();
        let args = GridArgs {
            config: Some(path),
            concurrency: Some(7),
        };
        let config = grid_config(&args).unwrap();
        assert_eq!(config.concurrency, 7);
        assert_eq!(config.budget().limit(), 7);
    }
}
