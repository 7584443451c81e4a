//! # Row Ranges
//!
//! Static partitioning of matrix rows across a fixed number of workers.
//! The first `rows % workers` ranges get one extra row, so range lengths never
//! differ by more than one.

use std::ops::Range;

/// A contiguous block of matrix rows owned by one worker, half-open `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, row: usize) -> bool {
        self.start <= row && row < self.end
    }

    /// Inclusive last row, `None` for an empty range
    pub fn last(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.end - 1)
        }
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Split `row_count` rows into `worker_count` contiguous ranges.
///
/// Returns exactly `worker_count` ranges in increasing row order. When there
/// are more workers than rows the trailing ranges are empty.
pub fn partition(row_count: usize, worker_count: usize) -> Vec<RowRange> {
    if worker_count == 0 {
        return Vec::new();
    }

    let base = row_count / worker_count;
    let remainder = row_count % worker_count;

    let mut ranges = Vec::with_capacity(worker_count);
    let mut start = 0;
    for w in 0..worker_count {
        let len = if w < remainder { base + 1 } else { base };
        ranges.push(RowRange::new(start, start + len));
        start += len;
    }
    debug_assert_eq!(start, row_count);
    ranges
}
