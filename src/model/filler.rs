//! # Row Filler
//!
//! Fills one worker's block of rows. Every off-diagonal cell gets a uniform
//! draw from `[0, max_value]`; the diagonal cell gets the row's off-diagonal
//! sum. The sum is accumulated in `u64` and truncated (wrapping) to the `u32`
//! cell, so rows with `max_value * (N - 1) > u32::MAX` still satisfy the
//! row-sum invariant modulo 2^32.
//!
//! Each filler owns its generator; workers never share random state.

use rand::distr::{Distribution, Uniform};
use rand::Rng;

use crate::data::range::RowRange;
use crate::error::{DiagfillError, Result};
use crate::utils::progress::ProgressTracker;

pub struct RowFiller<R: Rng> {
    worker: usize,
    range: RowRange,
    size: usize,
    dist: Uniform<u32>,
    rng: R,
}

impl<R: Rng> RowFiller<R> {
    pub fn new(worker: usize, range: RowRange, size: usize, dist: Uniform<u32>, rng: R) -> Self {
        Self {
            worker,
            range,
            size,
            dist,
            rng,
        }
    }

    pub fn range(&self) -> RowRange {
        self.range
    }

    /// Fill `rows`, which must be exactly this filler's row block.
    ///
    /// Reports one completed row to `progress` after each row.
    pub fn fill(&mut self, rows: &mut [u32], progress: &ProgressTracker) -> Result<()> {
        let expected = self.range.len() * self.size;
        if rows.len() != expected {
            return Err(DiagfillError::worker(
                self.worker,
                format!(
                    "row block has {} cells, range {:?} needs {}",
                    rows.len(),
                    self.range,
                    expected
                ),
            ));
        }
        if self.range.is_empty() {
            return Ok(());
        }

        let threshold = progress.threshold();
        for (row_idx, row) in self.range.rows().zip(rows.chunks_exact_mut(self.size)) {
            let mut row_sum = 0u64;
            for (col, cell) in row.iter_mut().enumerate() {
                if col == row_idx {
                    continue;
                }
                let value = self.dist.sample(&mut self.rng);
                *cell = value;
                row_sum += value as u64;
            }
            row[row_idx] = row_sum as u32;

            progress.report(1);
            progress.maybe_flush(threshold);
        }
        Ok(())
    }
}

/// Inclusive `[0, max_value]` distribution for off-diagonal cells
pub fn cell_distribution(max_value: u32) -> Result<Uniform<u32>> {
    if max_value == 0 {
        return Err(DiagfillError::config("max value must be > 0"));
    }
    Uniform::new_inclusive(0, max_value)
        .map_err(|e| DiagfillError::config(format!("invalid max value {}: {}", max_value, e)))
}
