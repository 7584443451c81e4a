//! # Configuration Logic
//!
//! ## Role
//! CLI argument parsing and validation.
//!
//! ## Arguments
//! - `threads`: fill worker count (1..=65535)
//! - `matrix_size`: rows and columns of the square matrix (> 0)
//! - `max_value`: inclusive upper bound for off-diagonal cells
//!   (> 0, <= u32::MAX, default 100000)
//!
//! Values are parsed as signed integers so that zero and negative input reach
//! validation and produce the usage text instead of a clap error.
//!
//! ## Example CLI
//! ```bash
//! diagfill 8 10000
//! diagfill 8 10000 500 --seed 42 --verify
//! ```

use std::time::Duration;

use clap::Parser;

use crate::error::{DiagfillError, Result};
use crate::pipelines::fill::{FillOptions, DEFAULT_MAX_VALUE, MAX_WORKERS};

/// Usage text printed on any argument error
pub const USAGE: &str = "
    Illegal arguments list:
    Threads for process as $1 argument (min 1).
    Matrix size as $2 argument (> 0).
    Max value of matrix element as $3 argument (> 0, default 100000).
";

/// Process exit status for an argument error (-1 as an 8-bit status)
pub const EXIT_USAGE: u8 = 255;

/// Process exit status for the outcome of a run.
///
/// Argument errors map to `EXIT_USAGE`, every other failure to 1.
pub fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) if e.is_config() => EXIT_USAGE,
        Err(_) => 1,
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "diagfill", version)]
#[command(about = "Fill a random matrix whose diagonal holds each row's sum, with a live resource monitor")]
#[command(allow_negative_numbers = true)]
pub struct Config {
    /// Worker threads used for the fill
    pub threads: i64,

    /// Number of rows and columns
    pub matrix_size: i64,

    /// Inclusive upper bound for off-diagonal cells
    #[arg(default_value_t = DEFAULT_MAX_VALUE as i64)]
    pub max_value: i64,

    /// Fixed base seed; each worker derives its own seed from it
    #[arg(long)]
    pub seed: Option<u64>,

    /// Monitor sampling interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Do not start the resource monitor
    #[arg(long)]
    pub no_monitor: bool,

    /// Check the row-sum invariant after the fill
    #[arg(long)]
    pub verify: bool,

    /// Print span timings to stderr
    #[arg(long)]
    pub profile: bool,
}

impl Config {
    /// Parse from the process arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::try_parse().map_err(|e| match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                e.exit()
            }
            _ => DiagfillError::config(e.to_string()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from an explicit argument list (first item is the program name)
    pub fn parse_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config =
            Self::try_parse_from(args).map_err(|e| DiagfillError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads <= 0 {
            return Err(DiagfillError::config(format!(
                "thread count must be >= 1, got {}",
                self.threads
            )));
        }
        if self.threads > MAX_WORKERS as i64 {
            return Err(DiagfillError::config(format!(
                "thread count must be <= {}, got {}",
                MAX_WORKERS, self.threads
            )));
        }
        if self.matrix_size <= 0 {
            return Err(DiagfillError::config(format!(
                "matrix size must be > 0, got {}",
                self.matrix_size
            )));
        }
        if self.max_value <= 0 {
            return Err(DiagfillError::config(format!(
                "max value must be > 0, got {}",
                self.max_value
            )));
        }
        if self.max_value > u32::MAX as i64 {
            return Err(DiagfillError::config(format!(
                "max value {} does not fit a matrix cell (max {})",
                self.max_value,
                u32::MAX
            )));
        }
        if usize::try_from(self.matrix_size)
            .ok()
            .and_then(|n| n.checked_mul(n))
            .is_none()
        {
            return Err(DiagfillError::config(format!(
                "matrix size {} is too large for this platform",
                self.matrix_size
            )));
        }
        if self.interval_ms == 0 {
            return Err(DiagfillError::config("monitor interval must be > 0 ms"));
        }
        Ok(())
    }

    pub fn workers(&self) -> usize {
        usize::try_from(self.threads).unwrap_or(1).clamp(1, MAX_WORKERS)
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix_size.max(0) as usize
    }

    pub fn max_value(&self) -> u32 {
        self.max_value.clamp(0, u32::MAX as i64) as u32
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fill_options(&self) -> FillOptions {
        FillOptions {
            workers: self.workers(),
            max_value: self.max_value(),
            seed: self.seed,
        }
    }
}
