//! # Pipeline Module
//!
//! High-level orchestration of a fill run.
//! Coordinates partitioning, worker threads, and progress.

pub mod fill;

pub use fill::{FillEngine, FillOptions, DEFAULT_MAX_VALUE, MAX_WORKERS};
