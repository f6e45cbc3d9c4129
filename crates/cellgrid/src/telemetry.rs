//! Opt-in lock wait and operation counters.
//!
//! Enabled with `CELLGRID_PERF=1`. When disabled every entry point is a
//! single cached boolean check.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::info;

fn env_truthy(var: &str) -> Option<bool> {
    std::env::var(var).map(|v| v != "0" && !v.is_empty()).ok()
}

static PERF_ENABLED: Lazy<bool> = Lazy::new(|| env_truthy("CELLGRID_PERF").unwrap_or(false));

static STATS: Lazy<Mutex<HashMap<&'static str, PerfStat>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

const REPORT_EVERY: u64 = 10_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerfStat {
    pub count: u64,
    pub total_ns: u128,
    pub max_ns: u128,
}

impl PerfStat {
    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.total_ns / self.count as u128) as u64)
    }

    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns as u64)
    }
}

pub fn enabled() -> bool {
    *PERF_ENABLED
}

pub fn record_duration(label: &'static str, duration: Duration) {
    if !enabled() {
        return;
    }
    let mut stats = STATS.lock();
    let entry = stats.entry(label).or_default();
    entry.count += 1;
    let nanos = duration.as_nanos();
    entry.total_ns += nanos;
    entry.max_ns = entry.max_ns.max(nanos);
    if entry.count % REPORT_EVERY == 0 {
        report(label, entry);
    }
}

/// Current counters, sorted by label.
pub fn snapshot() -> Vec<(&'static str, PerfStat)> {
    let stats = STATS.lock();
    let mut out: Vec<_> = stats.iter().map(|(label, stat)| (*label, *stat)).collect();
    out.sort_by_key(|(label, _)| *label);
    out
}

fn report(label: &'static str, stat: &PerfStat) {
    info!(
        target: "cellgrid.perf",
        label,
        count = stat.count,
        avg_us = stat.avg().as_secs_f64() * 1e6,
        max_us = stat.max().as_secs_f64() * 1e6,
        "lock timing"
    );
}

/// Records the time between construction and drop under `label`.
pub struct PerfGuard {
    label: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(label: &'static str) -> Option<Self> {
        if !enabled() {
            return None;
        }
        Some(Self {
            label,
            start: Instant::now(),
        })
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        record_duration(self.label, self.start.elapsed());
    }
}
