//! Striped reader-writer locks over the grid's cells.
//!
//! The partition is a set of units. Cell `(row, col)` has flat index
//! `row * cols + col` and lives in unit `flat % size`, at offset
//! `flat / size` inside that unit's stripe. Each unit owns the values of the
//! cells it governs, so a cell can only be read or written while its unit is
//! held.
//!
//! Mapping and size are only meaningful for the dimensions they were computed
//! under. Anything that changes dimensions or size takes `&mut self`, which the
//! container can only hand out while its structural gate is held exclusively.

use std::mem;
use std::num::NonZeroUsize;
use std::thread;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use tracing::{debug, trace};

use crate::store::CellStore;

type Stripe = Vec<String>;

/// Upper bound on partition size requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyBudget {
    /// Twice the hardware concurrency.
    #[default]
    Auto,
    Limit(NonZeroUsize),
}

impl ConcurrencyBudget {
    /// Values `<= 0` mean [`ConcurrencyBudget::Auto`].
    pub fn from_raw(raw: i64) -> Self {
        usize::try_from(raw)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Self::Auto, Self::Limit)
    }

    pub fn limit(self) -> usize {
        match self {
            Self::Auto => hardware_concurrency().saturating_mul(2),
            Self::Limit(limit) => limit.get(),
        }
    }
}

pub fn hardware_concurrency() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// `max(1, min(budget, rows * cols))`
pub fn partition_size(rows: usize, cols: usize, budget: ConcurrencyBudget) -> usize {
    budget.limit().min(rows.saturating_mul(cols)).max(1)
}

/// Where a cell lives under the layout it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub flat: usize,
    pub unit: usize,
    pub offset: usize,
}

pub struct LockPartition {
    units: Vec<RwLock<Stripe>>,
    rows: usize,
    cols: usize,
    budget: ConcurrencyBudget,
}

impl LockPartition {
    pub fn new(store: CellStore, budget: ConcurrencyBudget) -> Self {
        let mut partition = Self {
            units: Vec::new(),
            rows: 0,
            cols: 0,
            budget,
        };
        partition.replace(store);
        partition
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn budget(&self) -> ConcurrencyBudget {
        self.budget
    }

    /// Caller must have validated `row < rows` and `col < cols`.
    #[inline]
    pub(crate) fn slot(&self, row: usize, col: usize) -> Slot {
        debug_assert!(row < self.rows && col < self.cols);
        let flat = row * self.cols + col;
        let size = self.size();
        Slot {
            flat,
            unit: flat % size,
            offset: flat / size,
        }
    }

    /// The unit governing `(row, col)` under the current dimensions.
    pub fn unit_for(&self, row: usize, col: usize) -> usize {
        self.slot(row, col).unit
    }

    pub(crate) fn read(&self, slot: Slot) -> MappedRwLockReadGuard<'_, String> {
        trace!(target: "cellgrid.partition", unit = slot.unit, "unit shared");
        RwLockReadGuard::map(self.units[slot.unit].read(), |stripe| &stripe[slot.offset])
    }

    pub(crate) fn write(&self, slot: Slot) -> MappedRwLockWriteGuard<'_, String> {
        trace!(target: "cellgrid.partition", unit = slot.unit, "unit exclusive");
        RwLockWriteGuard::map(self.units[slot.unit].write(), |stripe| {
            &mut stripe[slot.offset]
        })
    }

    /// Lock the units of two cells exclusively.
    ///
    /// Units are always taken in ascending unit order, so any two callers
    /// contending for the same pair agree on which to take first. When both
    /// cells share a unit it is locked once. Every operation that needs more
    /// than one unit at a time must go through here.
    pub(crate) fn lock_pair(&self, a: Slot, b: Slot) -> PairGuard<'_> {
        if a.unit == b.unit {
            trace!(target: "cellgrid.partition", unit = a.unit, "pair shares unit");
            return PairGuard::Shared {
                stripe: self.units[a.unit].write(),
                a: a.offset,
                b: b.offset,
            };
        }
        let (low, high) = if a.unit < b.unit { (a, b) } else { (b, a) };
        trace!(
            target: "cellgrid.partition",
            first = low.unit,
            second = high.unit,
            "unit pair exclusive"
        );
        let low_guard = self.units[low.unit].write();
        let high_guard = self.units[high.unit].write();
        PairGuard::Split {
            low: (low_guard, low.offset),
            high: (high_guard, high.offset),
        }
    }

    /// Recompute the desired size and reallocate units if it changed.
    /// Returns whether a reallocation happened.
    ///
    /// Existing stripes are discarded; callers must refill them.
    pub fn resize_if_needed(&mut self) -> bool {
        let desired = partition_size(self.rows, self.cols, self.budget);
        if desired == self.size() {
            return false;
        }
        debug!(
            target: "cellgrid.partition",
            from = self.size(),
            to = desired,
            rows = self.rows,
            cols = self.cols,
            "resizing lock partition"
        );
        self.units = (0..desired).map(|_| RwLock::new(Vec::new())).collect();
        true
    }

    /// Install `store` as the new contents, resizing the partition to fit.
    pub fn replace(&mut self, store: CellStore) {
        let (rows, cols) = store.dims();
        self.rows = rows;
        self.cols = cols;
        self.resize_if_needed();

        let size = self.size();
        let per_unit = store.len().div_ceil(size);
        for unit in &mut self.units {
            let stripe = unit.get_mut();
            stripe.clear();
            stripe.reserve(per_unit);
        }
        // Flat order fills each stripe in ascending offset order.
        for (flat, value) in store.into_flat().enumerate() {
            self.units[flat % size].get_mut().push(value);
        }
    }

    /// Move every value out into a dense store, leaving blanks behind until
    /// the next [`LockPartition::replace`].
    pub fn take(&mut self) -> CellStore {
        let values = self.drain_flat(|stripe, offset| mem::take(&mut stripe[offset]));
        CellStore::from_flat(self.rows, self.cols, values)
    }

    /// Copy every value into a dense store.
    pub fn to_store(&mut self) -> CellStore {
        let values = self.drain_flat(|stripe, offset| stripe[offset].clone());
        CellStore::from_flat(self.rows, self.cols, values)
    }

    fn drain_flat<F>(&mut self, mut f: F) -> Vec<String>
    where
        F: FnMut(&mut Stripe, usize) -> String,
    {
        let size = self.size();
        let total = self.rows * self.cols;
        let mut values = Vec::with_capacity(total);
        for flat in 0..total {
            values.push(f(self.units[flat % size].get_mut(), flat / size));
        }
        values
    }
}

/// Exclusive hold on the unit(s) of two cells.
pub(crate) enum PairGuard<'a> {
    Shared {
        stripe: RwLockWriteGuard<'a, Stripe>,
        a: usize,
        b: usize,
    },
    Split {
        low: (RwLockWriteGuard<'a, Stripe>, usize),
        high: (RwLockWriteGuard<'a, Stripe>, usize),
    },
}

impl PairGuard<'_> {
    pub fn swap(&mut self) {
        match self {
            PairGuard::Shared { stripe, a, b } => stripe.swap(*a, *b),
            PairGuard::Split { low, high } => {
                mem::swap(&mut low.0[low.1], &mut high.0[high.1]);
            }
        }
    }
}
