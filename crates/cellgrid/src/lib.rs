//! A mutable 2D grid of text cells shared between threads.
//!
//! Access is arbitrated in two tiers. A coarse [`gate::StructuralGate`]
//! separates cell-level work, which runs concurrently, from structural work
//! (inserting rows or columns, loading, saving), which runs alone. Under the
//! gate, a [`partition::LockPartition`] spreads the cells across a set of
//! reader-writer units so writers to different units never contend.
//!
//! ```
//! # use std::sync::Arc;
//! # use std::thread;
//! # use cellgrid::ConcurrentGrid;
//! let grid = Arc::new(ConcurrentGrid::new(4, 4));
//! let handles: Vec<_> = (0..4)
//!     .map(|row| {
//!         let grid = Arc::clone(&grid);
//!         thread::spawn(move || grid.set_cell(row, row, format!("d{row}")).unwrap())
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(grid.get_cell(2, 2).unwrap(), "d2");
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod gate;
pub mod grid;
pub mod partition;
pub mod store;
pub mod telemetry;

pub use config::GridConfig;
pub use error::{Axis, GridError, GridResult};
pub use grid::{CellPos, ConcurrentGrid};
pub use partition::ConcurrencyBudget;
pub use store::CellStore;
