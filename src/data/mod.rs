//! # Data Module
//!
//! In-memory representation of the matrix and the row ranges that split it
//! between fill workers.
//!
//! ## Design
//! - **Flat row-major storage:** one `Vec<u32>`, so disjoint row blocks are
//!   plain `&mut [u32]` slices obtained with `split_at_mut`.
//! - **Ownership instead of locks:** each worker receives exactly one block;
//!   no cell is reachable from two workers.

pub mod matrix;
pub mod range;

// Re-export commonly used types
pub use matrix::Matrix;
pub use range::{partition, RowRange};
