//! # I/O Module
//!
//! Boundaries with the operating system. Converts kernel counter text into
//! typed values.

pub mod procfs;
