//! # diagfill Library
//!
//! Concurrent fill of a square matrix whose off-diagonal cells are random and
//! whose diagonal cells hold each row's sum, plus a live resource monitor.
//!
//! ## Modules
//! - `config`: CLI argument parsing and validation
//! - `data`: Matrix storage and row-range partitioning
//! - `error`: Error types and result aliases
//! - `io`: `/proc` counter parsing
//! - `model`: Per-worker row filling
//! - `pipelines`: Fill orchestration across worker threads
//! - `utils`: Progress tracking and the resource monitor
//!
//! ## Example
//! ```
//! use diagfill::{FillEngine, FillOptions, Matrix, ProgressTracker};
//!
//! let mut matrix = Matrix::new(100).unwrap();
//! let progress = ProgressTracker::new(100);
//! let engine = FillEngine::new(FillOptions { workers: 4, max_value: 1000, seed: Some(1) });
//! engine.run(&mut matrix, &progress).unwrap();
//! assert_eq!(matrix.verify_row_sums(), None);
//! assert_eq!(progress.visible_percent(), 100);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use data::{partition, Matrix, RowRange};
pub use error::{DiagfillError, Result};
pub use model::RowFiller;
pub use pipelines::{FillEngine, FillOptions};
pub use utils::progress::ProgressTracker;
pub use utils::telemetry::{MonitorConfig, MonitorHandle};
