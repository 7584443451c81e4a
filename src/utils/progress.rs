//! # Fill Progress Tracker
//!
//! Two-tier progress counter shared by all fill workers and read by the monitor.
//!
//! - Hot path: workers `report` completed rows with a relaxed `fetch_add`; no lock.
//! - Flush: roughly every `threshold` rows one worker drains the counter into
//!   the visible percent under a mutex. Workers use `try_lock`, so a worker that
//!   finds a flush in progress just keeps filling rows.
//!
//! The visible percent only ever grows. Once it reaches 98 it is forced to 100.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

/// Visible percent at or above this value is displayed as 100
pub const CLAMP_PERCENT: u32 = 98;

#[derive(Debug)]
pub struct ProgressTracker {
    /// Rows completed since the last flush
    pending: AtomicU64,
    /// Percent shown to the monitor, in [0, 100]
    visible: AtomicU32,
    /// Rows drained by all flushes so far; the mutex also serializes flushes
    flushed: Mutex<u64>,
    total_rows: u64,
    threshold: u64,
}

impl ProgressTracker {
    /// Create a tracker for a fill of `total_rows` rows.
    ///
    /// The flush threshold is one percent of the rows (at least one row).
    pub fn new(total_rows: u64) -> Self {
        Self {
            pending: AtomicU64::new(0),
            visible: AtomicU32::new(0),
            flushed: Mutex::new(0),
            total_rows,
            threshold: (total_rows / 100).max(1),
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Record `n` completed rows. Lock-free.
    #[inline]
    pub fn report(&self, n: u64) {
        self.pending.fetch_add(n, Ordering::Relaxed);
    }

    /// Flush pending rows into the visible percent if more than `threshold`
    /// rows are pending and no other flush is running.
    ///
    /// Returns `true` if this call performed a flush.
    #[inline]
    pub fn maybe_flush(&self, threshold: u64) -> bool {
        let threshold = threshold.max(1);
        if self.pending.load(Ordering::Relaxed) <= threshold {
            return false;
        }

        let mut flushed = match self.flushed.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };

        // Another worker may have drained the counter while we raced for the lock
        if self.pending.load(Ordering::Relaxed) <= threshold {
            return false;
        }
        self.flush_locked(&mut flushed, threshold)
    }

    /// Flush whatever is pending, waiting for any in-progress flush.
    pub fn drain(&self) {
        let mut flushed = self.lock_flushed();
        self.flush_locked(&mut flushed, self.threshold);
    }

    /// Current visible percent. Never blocks.
    #[inline]
    pub fn visible_percent(&self) -> u32 {
        self.visible.load(Ordering::Acquire)
    }

    /// Rows drained into the visible percent so far
    pub fn flushed_rows(&self) -> u64 {
        *self.lock_flushed()
    }

    fn lock_flushed(&self) -> MutexGuard<'_, u64> {
        // The guarded total is a plain counter, valid even after a worker panic
        self.flushed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush_locked(&self, flushed: &mut u64, threshold: u64) -> bool {
        let drained = self.pending.swap(0, Ordering::AcqRel);
        if drained == 0 {
            return false;
        }
        *flushed += drained;

        let delta = (drained / threshold).min(100) as u32;
        let current = self.visible.load(Ordering::Relaxed);
        let mut next = current.saturating_add(delta).min(100);
        if next >= CLAMP_PERCENT || *flushed >= self.total_rows {
            next = 100;
        }
        // Only flushes store, and flushes are serialized, so this never decreases
        self.visible.store(next, Ordering::Release);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_threshold() {
        assert_eq!(ProgressTracker::new(1000).threshold(), 10);
        assert_eq!(ProgressTracker::new(50).threshold(), 1);
        assert_eq!(ProgressTracker::new(0).threshold(), 1);
    }

    #[test]
    fn test_flush_requires_exceeding_threshold() {
        let p = ProgressTracker::new(1000);
        p.report(10);
        assert!(!p.maybe_flush(10));
        assert_eq!(p.visible_percent(), 0);

        p.report(1);
        assert!(p.maybe_flush(10));
        assert_eq!(p.visible_percent(), 1);
        assert_eq!(p.flushed_rows(), 11);
    }

    #[test]
    fn test_flush_resets_counter() {
        let p = ProgressTracker::new(1000);
        p.report(35);
        assert!(p.maybe_flush(10));
        assert_eq!(p.visible_percent(), 3);
        // Nothing pending after the reset
        assert!(!p.maybe_flush(10));
        p.report(5);
        assert!(!p.maybe_flush(10));
        assert_eq!(p.visible_percent(), 3);
    }

    #[test]
    fn test_clamps_to_100_at_98() {
        let p = ProgressTracker::new(1000);
        p.report(975);
        p.maybe_flush(10);
        assert_eq!(p.visible_percent(), 97);

        p.report(11);
        p.maybe_flush(10);
        // 98 is never displayed, it jumps straight to 100
        assert_eq!(p.visible_percent(), 100);
    }

    #[test]
    fn test_drain_reaches_100_on_completion() {
        let p = ProgressTracker::new(50);
        for _ in 0..50 {
            p.report(1);
            p.maybe_flush(p.threshold());
        }
        p.drain();
        assert_eq!(p.visible_percent(), 100);
        assert_eq!(p.flushed_rows(), 50);
    }

    #[test]
    fn test_concurrent_reports_reach_100() {
        let total = 10_000u64;
        let n_threads = 8u64;
        let p = Arc::new(ProgressTracker::new(total));

        let handles: Vec<_> = (0..n_threads)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..total / n_threads {
                        p.report(1);
                        p.maybe_flush(p.threshold());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        p.drain();
        assert_eq!(p.flushed_rows(), total);
        assert_eq!(p.visible_percent(), 100);
    }

    #[test]
    fn test_visible_percent_is_monotonic() {
        let total = 20_000u64;
        let p = Arc::new(ProgressTracker::new(total));

        let observer = {
            let p = Arc::clone(&p);
            thread::spawn(move || {
                let mut last = 0;
                while last < 100 {
                    let now = p.visible_percent();
                    assert!(now >= last, "percent went from {} to {}", last, now);
                    assert!(now <= 100);
                    last = now;
                    thread::yield_now();
                }
            })
        };

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..total / 4 {
                        p.report(1);
                        p.maybe_flush(p.threshold());
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        p.drain();
        observer.join().unwrap();
    }
}
