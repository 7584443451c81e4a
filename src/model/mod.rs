//! # Model Module
//!
//! Per-worker generation logic.
//!
//! - `filler`: fills one row block with uniform draws and writes each row's
//!   off-diagonal sum into its diagonal cell

pub mod filler;

pub use filler::{cell_distribution, RowFiller};
