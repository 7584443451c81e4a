//! # Square Matrix
//!
//! Dense `N x N` matrix of `u32` cells stored row-major in a single buffer.
//!
//! After a fill, every row satisfies the row-sum invariant: the diagonal cell
//! holds the sum of the other cells in that row, truncated to 32 bits
//! (wrapping). Sums are always accumulated in `u64`.

use rayon::prelude::*;

use crate::data::range::RowRange;
use crate::error::{DiagfillError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    size: usize,
    data: Vec<u32>,
}

impl Matrix {
    /// Zero-filled `size x size` matrix.
    ///
    /// Fails if `size * size` cells cannot be addressed.
    pub fn new(size: usize) -> Result<Self> {
        let cells = size.checked_mul(size).ok_or_else(|| {
            DiagfillError::config(format!("matrix size {} overflows the cell count", size))
        })?;
        Ok(Self {
            size,
            data: vec![0; cells],
        })
    }

    /// Build from explicit rows (used by tests and tools)
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(DiagfillError::config(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    size
                )));
            }
            data.extend(row);
        }
        Ok(Self { size, data })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.size + col]
    }

    pub fn row(&self, row: usize) -> &[u32] {
        let start = row * self.size;
        &self.data[start..start + self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        // chunks_exact(0) panics; an empty matrix has no rows anyway
        self.data.chunks_exact(self.size.max(1))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Split the buffer into one mutable row block per range.
    ///
    /// Ranges must be contiguous, in increasing order, and cover every row.
    pub fn split_rows_mut(&mut self, ranges: &[RowRange]) -> Result<Vec<&mut [u32]>> {
        let mut expected = 0;
        for r in ranges {
            if r.start != expected || r.end < r.start {
                return Err(DiagfillError::config(format!(
                    "row ranges are not contiguous at {:?}",
                    r
                )));
            }
            expected = r.end;
        }
        if expected != self.size {
            return Err(DiagfillError::config(format!(
                "row ranges cover {} rows, matrix has {}",
                expected, self.size
            )));
        }

        let mut blocks = Vec::with_capacity(ranges.len());
        let mut rest: &mut [u32] = &mut self.data;
        for r in ranges {
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(r.len() * self.size);
            blocks.push(block);
            rest = tail;
        }
        Ok(blocks)
    }

    /// Whether row `i` satisfies the (wrapping) row-sum invariant
    pub fn row_sum_holds(&self, i: usize) -> bool {
        row_sum_holds(self.row(i), i)
    }

    /// Check every row in parallel; returns the first violating row, if any
    pub fn verify_row_sums(&self) -> Option<usize> {
        if self.size == 0 {
            return None;
        }
        self.data
            .par_chunks_exact(self.size)
            .enumerate()
            .find_first(|(i, row)| !row_sum_holds(row, *i))
            .map(|(i, _)| i)
    }

    /// Largest off-diagonal value, `None` for matrices smaller than 2x2
    pub fn max_off_diagonal(&self) -> Option<u32> {
        self.rows()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(move |(j, _)| *j != i)
                    .map(|(_, &v)| v)
            })
            .max()
    }

    /// Heap bytes held by the cell buffer
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<u32>()
    }
}

/// Sum of the off-diagonal cells of a row, accumulated in 64 bits
#[inline]
pub fn off_diagonal_sum(row: &[u32], diag: usize) -> u64 {
    row.iter()
        .enumerate()
        .filter(|(j, _)| *j != diag)
        .map(|(_, &v)| v as u64)
        .sum()
}

#[inline]
fn row_sum_holds(row: &[u32], diag: usize) -> bool {
    row[diag] == off_diagonal_sum(row, diag) as u32
}
