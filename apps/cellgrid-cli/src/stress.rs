//! Multi-threaded workload against an in-memory grid.
//!
//! The grid is seeded with a unique label per cell. Workers mix reads,
//! searches, writes of fresh unique values, row/column exchanges and the
//! occasional insert. Exchanges only permute values and writes only replace
//! them, so at the end no non-empty value may appear twice; a duplicate means
//! a swap was torn.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use cellgrid::{CellStore, ConcurrencyBudget, ConcurrentGrid, telemetry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::cli::StressArgs;
use crate::error::CliError;

#[derive(Debug)]
pub struct StressReport {
    pub threads: usize,
    pub total_ops: usize,
    pub inserts: usize,
    pub elapsed: Duration,
    pub dims: (usize, usize),
    pub units: usize,
}

impl StressReport {
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_ops as f64 / secs
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{} ops on {} threads in {:.3}s ({:.0} ops/s)",
            self.total_ops,
            self.threads,
            self.elapsed.as_secs_f64(),
            self.ops_per_sec()
        )?;
        writeln!(
            out,
            "final grid {}x{} with {} lock units after {} inserts",
            self.dims.0, self.dims.1, self.units, self.inserts
        )?;
        for (label, stat) in telemetry::snapshot() {
            writeln!(
                out,
                "  {label}: count={} avg={:?} max={:?}",
                stat.count,
                stat.avg(),
                stat.max()
            )?;
        }
        Ok(())
    }
}

pub fn run(args: &StressArgs, budget: ConcurrencyBudget) -> Result<StressReport, CliError> {
    if args.rows == 0 || args.cols == 0 || args.threads == 0 {
        return Err(CliError::InvalidArgument(
            "stress needs at least one row, one column and one thread".into(),
        ));
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let store = CellStore::from_rows((0..args.rows).map(|row| {
        (0..args.cols)
            .map(move |col| format!("s:{row}:{col}"))
            .collect::<Vec<_>>()
    }));
    let grid = Arc::new(ConcurrentGrid::from_store(store, budget));
    info!(
        target: "cellgrid_cli::stress",
        rows = args.rows,
        cols = args.cols,
        threads = args.threads,
        units = grid.unit_count(),
        seed,
        "starting stress run"
    );

    let barrier = Arc::new(Barrier::new(args.threads + 1));
    let handles: Vec<_> = (0..args.threads)
        .map(|worker| {
            let grid = Arc::clone(&grid);
            let barrier = Arc::clone(&barrier);
            let args = args.clone();
            thread::Builder::new()
                .name(format!("stress-{worker}"))
                .spawn(move || {
                    let rng = StdRng::seed_from_u64(seed.wrapping_add(worker as u64));
                    barrier.wait();
                    drive(&grid, &args, worker, rng)
                })
        })
        .collect::<io::Result<_>>()?;

    barrier.wait();
    let started = Instant::now();
    let mut inserts = 0;
    for handle in handles {
        inserts += handle
            .join()
            .map_err(|_| CliError::Stress("worker panicked".into()))??;
    }
    let elapsed = started.elapsed();

    let snapshot = grid.snapshot();
    verify(&snapshot, args, inserts)?;

    let report = StressReport {
        threads: args.threads,
        total_ops: args.threads * args.ops_per_thread,
        inserts,
        elapsed,
        dims: snapshot.dims(),
        units: grid.unit_count(),
    };
    info!(
        target: "cellgrid_cli::stress",
        ops_per_sec = report.ops_per_sec(),
        inserts,
        "stress run finished"
    );
    Ok(report)
}

/// One worker's loop. Indices are drawn from the initial dimensions, which
/// stay valid because the grid only grows.
fn drive(
    grid: &ConcurrentGrid,
    args: &StressArgs,
    worker: usize,
    mut rng: StdRng,
) -> Result<usize, CliError> {
    let mut inserts = 0;
    for op in 0..args.ops_per_thread {
        if args.structural_every > 0 && op > 0 && op % args.structural_every == 0 {
            if rng.gen_bool(0.5) {
                grid.insert_row(Some(rng.gen_range(0..args.rows)))?;
            } else {
                grid.insert_column(None)?;
            }
            inserts += 1;
            continue;
        }
        let row = rng.gen_range(0..args.rows);
        let col = rng.gen_range(0..args.cols);
        match rng.gen_range(0..10) {
            0..=3 => {
                grid.get_cell(row, col)?;
            }
            4..=5 => grid.set_cell(row, col, format!("w:{worker}:{op}"))?,
            6 => {
                grid.search_string(&format!("s:{row}:{col}"));
            }
            7..=8 => grid.exchange_row(row, rng.gen_range(0..args.rows))?,
            _ => grid.exchange_column(col, rng.gen_range(0..args.cols))?,
        }
    }
    Ok(inserts)
}

fn verify(snapshot: &CellStore, args: &StressArgs, inserts: usize) -> Result<(), CliError> {
    let (rows, cols) = snapshot.dims();
    if rows + cols != args.rows + args.cols + inserts {
        return Err(CliError::Stress(format!(
            "grid is {rows}x{cols} after {inserts} inserts on {}x{}",
            args.rows, args.cols
        )));
    }
    let mut seen = HashSet::new();
    for value in snapshot.iter_rows().flatten() {
        if !value.is_empty() && !seen.insert(value.as_str()) {
            warn!(target: "cellgrid_cli::stress", %value, "duplicate value");
            return Err(CliError::Stress(format!("value {value:?} appears twice")));
        }
    }
    Ok(())
}
