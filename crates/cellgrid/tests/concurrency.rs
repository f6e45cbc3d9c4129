use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cellgrid::{CellStore, ConcurrencyBudget, ConcurrentGrid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn limit(n: usize) -> ConcurrencyBudget {
    ConcurrencyBudget::Limit(NonZeroUsize::new(n).unwrap())
}

fn numbered(rows: usize, cols: usize) -> CellStore {
    CellStore::from_rows(
        (0..rows).map(|r| (0..cols).map(move |c| format!("{r}.{c}")).collect::<Vec<_>>()),
    )
}

fn histogram(store: &CellStore) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in store.iter_rows().flatten() {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

#[test_timeout::timeout(30)]
fn writers_on_distinct_units_do_not_lose_updates() {
    let grid = Arc::new(ConcurrentGrid::with_budget(2, 2, limit(4)));
    assert_ne!(grid_unit(&grid, 0, 0), grid_unit(&grid, 1, 1));
    let barrier = Arc::new(Barrier::new(2));

    let spawn_writer = |row: usize, col: usize, tag: &'static str| {
        let grid = Arc::clone(&grid);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..2_000 {
                grid.set_cell(row, col, format!("{tag}{i}")).unwrap();
            }
        })
    };

    let first = spawn_writer(0, 0, "a");
    let second = spawn_writer(1, 1, "b");
    first.join().unwrap();
    second.join().unwrap();

    assert_eq!(grid.get_cell(0, 0).unwrap(), "a1999");
    assert_eq!(grid.get_cell(1, 1).unwrap(), "b1999");
    assert_eq!(grid.get_cell(0, 1).unwrap(), "");
}

fn grid_unit(grid: &ConcurrentGrid, row: usize, col: usize) -> usize {
    let (_, cols) = grid.dims();
    (row * cols + col) % grid.unit_count()
}

#[test_timeout::timeout(30)]
fn readers_only_see_completed_writes() {
    let grid = Arc::new(ConcurrentGrid::with_budget(1, 1, limit(1)));
    grid.set_cell(0, 0, "0").unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let grid = Arc::clone(&grid);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = 0u32;
            while !done.load(Ordering::Acquire) {
                let seen: u32 = grid.get_cell(0, 0).unwrap().parse().unwrap();
                assert!(seen >= last, "went backwards: {seen} after {last}");
                last = seen;
            }
        })
    };

    for i in 1..=5_000u32 {
        grid.set_cell(0, 0, i.to_string()).unwrap();
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();
    assert_eq!(grid.get_cell(0, 0).unwrap(), "5000");
}

#[test_timeout::timeout(60)]
fn overlapping_exchanges_do_not_deadlock() {
    // Few units relative to cells so pairs collide and wrap across units.
    let rows = 6;
    let cols = 5;
    let grid = Arc::new(ConcurrentGrid::from_store(numbered(rows, cols), limit(3)));
    let before = histogram(&grid.snapshot());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|seed| {
            let grid = Arc::clone(&grid);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed as u64);
                barrier.wait();
                for _ in 0..2_000 {
                    if rng.gen_bool(0.5) {
                        let a = rng.gen_range(0..rows);
                        let b = rng.gen_range(0..rows);
                        grid.exchange_row(a, b).unwrap();
                    } else {
                        let a = rng.gen_range(0..cols);
                        let b = rng.gen_range(0..cols);
                        grid.exchange_column(a, b).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(histogram(&grid.snapshot()), before);
}

#[test_timeout::timeout(60)]
fn structural_operations_interleave_with_cell_work() {
    let grid = Arc::new(ConcurrentGrid::from_store(numbered(4, 4), limit(6)));
    let before = histogram(&grid.snapshot());
    let barrier = Arc::new(Barrier::new(4));

    let swapper = {
        let grid = Arc::clone(&grid);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..500 {
                grid.exchange_row(i % 4, (i + 1) % 4).unwrap();
                grid.exchange_column(i % 4, (i + 3) % 4).unwrap();
            }
        })
    };
    let searcher = {
        let grid = Arc::clone(&grid);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..500 {
                assert_eq!(grid.search_string("absent"), None);
                if let Some(pos) = grid.search_string("2.2") {
                    let (rows, cols) = grid.dims();
                    assert!(pos.row < rows && pos.col < cols);
                }
            }
        })
    };
    let inserter = {
        let grid = Arc::clone(&grid);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..20 {
                if i % 2 == 0 {
                    grid.insert_row(None).unwrap();
                } else {
                    grid.insert_column(Some(0)).unwrap();
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    barrier.wait();
    swapper.join().unwrap();
    searcher.join().unwrap();
    inserter.join().unwrap();

    assert_eq!(grid.dims(), (14, 14));
    assert_eq!(grid.unit_count(), 6);
    let mut after = histogram(&grid.snapshot());
    let blanks = after.remove("").unwrap_or(0);
    assert_eq!(blanks, 14 * 14 - 16);
    assert_eq!(after, before);
}

#[test_timeout::timeout(30)]
fn save_is_a_consistent_snapshot_under_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.csv");
    let grid = Arc::new(ConcurrentGrid::with_budget(3, 3, limit(9)));
    let stop = Arc::new(AtomicBool::new(false));

    // The writer keeps every cell in a row equal, one row at a time, so any
    // snapshot shows each row as either all-old or mid-update.
    let writer = {
        let grid = Arc::clone(&grid);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut generation = 0u64;
            while !stop.load(Ordering::Acquire) {
                generation += 1;
                for col in 0..3 {
                    grid.set_cell(0, col, generation.to_string()).unwrap();
                }
            }
        })
    };

    for _ in 0..50 {
        grid.save(&path).unwrap();
        let copy = ConcurrentGrid::new(0, 0);
        copy.load(&path).unwrap();
        assert_eq!(copy.dims(), (3, 3));
        let row: Vec<u64> = copy
            .row_values(0)
            .unwrap()
            .iter()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        assert!(row.windows(2).all(|w| w[0] >= w[1]), "torn row {row:?}");
    }
    stop.store(true, Ordering::Release);
    writer.join().unwrap();
}
