//! # Utilities Module
//!
//! ## Role
//! Cross-cutting helpers shared by the fill engine and the binary.
//!
//! ## Sub-modules
//! - `progress`: Two-tier progress counter shared by fill workers
//! - `telemetry`: Background resource monitor and dashboard rendering

pub mod progress;
pub mod telemetry;
