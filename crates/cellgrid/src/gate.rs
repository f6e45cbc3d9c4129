//! The coarse structural lock.
//!
//! Cell operations enter in shared mode and run alongside each other;
//! structural operations enter in exclusive mode and see nothing else in
//! flight. The gate wraps the state it protects, so exclusive entry is the
//! only way to obtain `&mut` access to it. Guards release on drop, which
//! covers early returns and unwinding.
//!
//! `parking_lot`'s lock is eventually fair: a waiting exclusive holder stops
//! new shared holders from barging in, so neither side starves under bounded
//! contention.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

use crate::telemetry::PerfGuard;

pub type SharedGuard<'a, T> = RwLockReadGuard<'a, T>;
pub type ExclusiveGuard<'a, T> = RwLockWriteGuard<'a, T>;

#[derive(Debug, Default)]
pub struct StructuralGate<T> {
    inner: RwLock<T>,
}

impl<T> StructuralGate<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    pub fn shared(&self) -> SharedGuard<'_, T> {
        let _wait = PerfGuard::new("gate.shared_wait");
        let guard = self.inner.read();
        trace!(target: "cellgrid.gate", "shared");
        guard
    }

    pub fn exclusive(&self) -> ExclusiveGuard<'_, T> {
        let _wait = PerfGuard::new("gate.exclusive_wait");
        let guard = self.inner.write();
        trace!(target: "cellgrid.gate", "exclusive");
        guard
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn shared_holders_coexist() {
        let gate = StructuralGate::new(5);
        let a = gate.shared();
        let b = gate.shared();
        assert_eq!(*a + *b, 10);
    }

    #[test_timeout::timeout(10)]
    fn exclusive_waits_for_shared_holders() {
        let gate = Arc::new(StructuralGate::new(Vec::<u32>::new()));
        let released = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(2));

        let reader = {
            let gate = Arc::clone(&gate);
            let released = Arc::clone(&released);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let guard = gate.shared();
                barrier.wait();
                thread::sleep(Duration::from_millis(50));
                released.store(true, Ordering::SeqCst);
                drop(guard);
            })
        };

        barrier.wait();
        gate.exclusive().push(1);
        assert!(released.load(Ordering::SeqCst));
        reader.join().unwrap();
        assert_eq!(gate.shared().as_slice(), [1]);
    }

    #[test]
    fn guard_released_on_unwind() {
        let gate = Arc::new(StructuralGate::new(0u8));
        let panicking = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _guard = gate.exclusive();
                panic!("boom");
            })
        };
        assert!(panicking.join().is_err());
        // parking_lot locks do not poison
        *gate.exclusive() += 1;
        assert_eq!(Arc::try_unwrap(gate).ok().unwrap().into_inner(), 1);
    }
}
