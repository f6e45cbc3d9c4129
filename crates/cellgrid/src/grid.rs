//! The concurrent grid container.
//!
//! Every public operation enters the [`StructuralGate`] first: shared mode for
//! cell operations (get, set, search, exchange), exclusive mode for
//! structural ones (insert, load, save). Cell operations then take the
//! partition unit(s) of the cells they touch. Indices are checked against the
//! dimensions seen under the gate, before any unit is taken, so a rejected
//! call never touches a cell.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::codec;
use crate::config::GridConfig;
use crate::error::{Axis, GridError, GridResult, check_anchor, check_index};
use crate::gate::StructuralGate;
use crate::partition::{ConcurrencyBudget, LockPartition};
use crate::store::CellStore;
use crate::telemetry::PerfGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A `rows x cols` grid of strings shared between threads.
///
/// # Examples
///
/// ```
/// # use cellgrid::{ConcurrentGrid, CellPos};
/// let grid = ConcurrentGrid::new(3, 3);
/// grid.set_cell(1, 1, "X").unwrap();
/// assert_eq!(grid.search_string("X"), Some(CellPos::new(1, 1)));
/// grid.insert_row(Some(0)).unwrap();
/// assert_eq!(grid.dims(), (4, 3));
/// assert_eq!(grid.search_string("X"), Some(CellPos::new(2, 1)));
/// ```
pub struct ConcurrentGrid {
    gate: StructuralGate<LockPartition>,
}

impl ConcurrentGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_budget(rows, cols, ConcurrencyBudget::Auto)
    }

    pub fn with_budget(rows: usize, cols: usize, budget: ConcurrencyBudget) -> Self {
        Self::from_store(CellStore::new(rows, cols), budget)
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::with_budget(config.rows, config.cols, config.budget())
    }

    pub fn from_store(store: CellStore, budget: ConcurrencyBudget) -> Self {
        let partition = LockPartition::new(store, budget);
        debug!(
            target: "cellgrid.grid",
            rows = partition.dims().0,
            cols = partition.dims().1,
            units = partition.size(),
            "grid created"
        );
        Self {
            gate: StructuralGate::new(partition),
        }
    }

    /// Returns (rows, cols)
    pub fn dims(&self) -> (usize, usize) {
        self.gate.shared().dims()
    }

    /// Number of lock units currently partitioning the cells.
    pub fn unit_count(&self) -> usize {
        self.gate.shared().size()
    }

    pub fn budget(&self) -> ConcurrencyBudget {
        self.gate.shared().budget()
    }

    pub fn get_cell(&self, row: usize, col: usize) -> GridResult<String> {
        let partition = self.gate.shared();
        check_cell(&partition, row, col)?;
        let value = partition.read(partition.slot(row, col)).clone();
        Ok(value)
    }

    pub fn set_cell(&self, row: usize, col: usize, value: impl Into<String>) -> GridResult<()> {
        let value = value.into();
        let partition = self.gate.shared();
        check_cell(&partition, row, col)?;
        *partition.write(partition.slot(row, col)) = value;
        Ok(())
    }

    /// One row, read cell by cell. Concurrent writers may interleave between
    /// cells.
    pub fn row_values(&self, row: usize) -> GridResult<Vec<String>> {
        let partition = self.gate.shared();
        let (rows, cols) = partition.dims();
        check_index(Axis::Row, row, rows)?;
        Ok((0..cols)
            .map(|col| partition.read(partition.slot(row, col)).clone())
            .collect())
    }

    /// First cell equal to `value` in row-major order.
    ///
    /// Only one unit is held at a time, so a value written behind the cursor
    /// after it has passed is not seen.
    pub fn search_string(&self, value: &str) -> Option<CellPos> {
        let _perf = PerfGuard::new("op.search");
        let partition = self.gate.shared();
        let (rows, cols) = partition.dims();
        for row in 0..rows {
            for col in 0..cols {
                if *partition.read(partition.slot(row, col)) == value {
                    return Some(CellPos::new(row, col));
                }
            }
        }
        None
    }

    pub fn exchange_row(&self, a: usize, b: usize) -> GridResult<()> {
        let _perf = PerfGuard::new("op.exchange_row");
        let partition = self.gate.shared();
        let (rows, cols) = partition.dims();
        check_index(Axis::Row, a, rows)?;
        check_index(Axis::Row, b, rows)?;
        if a == b {
            return Ok(());
        }
        trace!(target: "cellgrid.grid", a, b, "exchange rows");
        for col in 0..cols {
            swap_cells(&partition, CellPos::new(a, col), CellPos::new(b, col));
        }
        Ok(())
    }

    pub fn exchange_column(&self, a: usize, b: usize) -> GridResult<()> {
        let _perf = PerfGuard::new("op.exchange_column");
        let partition = self.gate.shared();
        let (rows, cols) = partition.dims();
        check_index(Axis::Column, a, cols)?;
        check_index(Axis::Column, b, cols)?;
        if a == b {
            return Ok(());
        }
        trace!(target: "cellgrid.grid", a, b, "exchange columns");
        for row in 0..rows {
            swap_cells(&partition, CellPos::new(row, a), CellPos::new(row, b));
        }
        Ok(())
    }

    /// Insert an empty row after `after`, or before the first row when
    /// `after` is `None`.
    pub fn insert_row(&self, after: Option<usize>) -> GridResult<()> {
        let _perf = PerfGuard::new("op.insert_row");
        let mut partition = self.gate.exclusive();
        check_anchor(Axis::Row, after, partition.dims().0)?;
        let store = partition.take().with_row_inserted(after);
        partition.replace(store);
        debug!(
            target: "cellgrid.grid",
            ?after,
            rows = partition.dims().0,
            units = partition.size(),
            "row inserted"
        );
        Ok(())
    }

    /// Insert an empty column after `after`, or before the first column when
    /// `after` is `None`.
    pub fn insert_column(&self, after: Option<usize>) -> GridResult<()> {
        let _perf = PerfGuard::new("op.insert_column");
        let mut partition = self.gate.exclusive();
        check_anchor(Axis::Column, after, partition.dims().1)?;
        let store = partition.take().with_column_inserted(after);
        partition.replace(store);
        debug!(
            target: "cellgrid.grid",
            ?after,
            cols = partition.dims().1,
            units = partition.size(),
            "column inserted"
        );
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> GridResult<()> {
        let path = path.as_ref();
        let _perf = PerfGuard::new("op.save");
        let mut partition = self.gate.exclusive();
        let io_err = |source| GridError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        codec::encode(&partition.to_store(), BufWriter::new(file)).map_err(io_err)?;
        debug!(target: "cellgrid.grid", ?path, "grid saved");
        Ok(())
    }

    pub fn save_to<W: Write>(&self, out: W) -> GridResult<()> {
        let mut partition = self.gate.exclusive();
        codec::encode(&partition.to_store(), out)?;
        Ok(())
    }

    /// Replace the whole grid from a delimited text file. On failure the
    /// current contents are left untouched.
    pub fn load(&self, path: impl AsRef<Path>) -> GridResult<()> {
        let path = path.as_ref();
        let _perf = PerfGuard::new("op.load");
        let mut partition = self.gate.exclusive();
        let io_err = |source| GridError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let store = codec::decode(BufReader::new(file)).map_err(io_err)?;
        install(&mut partition, store);
        debug!(target: "cellgrid.grid", ?path, "grid loaded");
        Ok(())
    }

    pub fn load_from<R: BufRead>(&self, input: R) -> GridResult<()> {
        let mut partition = self.gate.exclusive();
        let store = codec::decode(input)?;
        install(&mut partition, store);
        Ok(())
    }

    /// A consistent copy of every cell.
    pub fn snapshot(&self) -> CellStore {
        self.gate.exclusive().to_store()
    }

    pub fn into_store(self) -> CellStore {
        self.gate.into_inner().take()
    }
}

impl Default for ConcurrentGrid {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl std::fmt::Debug for ConcurrentGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let partition = self.gate.shared();
        f.debug_struct("ConcurrentGrid")
            .field("dims", &partition.dims())
            .field("units", &partition.size())
            .finish()
    }
}

fn check_cell(partition: &LockPartition, row: usize, col: usize) -> GridResult<()> {
    let (rows, cols) = partition.dims();
    check_index(Axis::Row, row, rows)?;
    check_index(Axis::Column, col, cols)
}

fn swap_cells(partition: &LockPartition, a: CellPos, b: CellPos) {
    let a = partition.slot(a.row, a.col);
    let b = partition.slot(b.row, b.col);
    trace!(target: "cellgrid.grid", a = a.flat, b = b.flat, "swap cells");
    partition.lock_pair(a, b).swap();
}

fn install(partition: &mut LockPartition, store: CellStore) {
    let (rows, cols) = store.dims();
    partition.replace(store);
    debug!(
        target: "cellgrid.grid",
        rows,
        cols,
        units = partition.size(),
        "grid replaced"
    );
}
