//! # Fill Pipeline
//!
//! ## Role
//! Orchestrate a matrix fill: partition rows, run one `RowFiller` per worker on
//! its own OS thread, join them all, and time the run.
//!
//! ## Concurrency
//! - Workers are scoped threads created once and joined once. No pool, no
//!   work stealing, no rebalancing.
//! - Each worker owns a disjoint `&mut [u32]` row block, so the matrix needs no
//!   lock. The only shared mutable state is the `ProgressTracker`.
//! - A failing worker never cuts the run short: every spawned worker is joined
//!   before the first failure is returned.

use std::any::Any;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info_span, warn};

use crate::data::matrix::Matrix;
use crate::data::range::partition;
use crate::error::{DiagfillError, Result};
use crate::model::filler::{cell_distribution, RowFiller};
use crate::utils::progress::ProgressTracker;

/// Default upper bound for off-diagonal cells
pub const DEFAULT_MAX_VALUE: u32 = 100_000;

/// Most worker threads a single run may spawn
pub const MAX_WORKERS: usize = u16::MAX as usize;

/// Mixed into fixed seeds so neighbouring base seeds give unrelated streams
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Options for one fill run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillOptions {
    /// Number of worker threads
    pub workers: usize,
    /// Inclusive upper bound for off-diagonal cells
    pub max_value: u32,
    /// Fixed base seed; `None` seeds every worker from OS entropy
    pub seed: Option<u64>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            max_value: DEFAULT_MAX_VALUE,
            seed: None,
        }
    }
}

/// Seed for worker `worker` derived from a fixed base seed
pub fn worker_seed(base: u64, worker: usize) -> u64 {
    base.wrapping_add(worker as u64).wrapping_mul(SEED_MIX)
}

pub struct FillEngine {
    options: FillOptions,
}

impl FillEngine {
    pub fn new(options: FillOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    /// Fill `matrix`, seeding each worker per `FillOptions::seed`.
    ///
    /// Returns the wall-clock time spent spawning and joining the workers.
    pub fn run(&self, matrix: &mut Matrix, progress: &ProgressTracker) -> Result<Duration> {
        match self.options.seed {
            Some(base) => self.run_with(matrix, progress, |worker| {
                Ok(SmallRng::seed_from_u64(worker_seed(base, worker)))
            }),
            None => self.run_with(matrix, progress, |worker| {
                SmallRng::try_from_os_rng().map_err(|e| {
                    DiagfillError::worker(worker, format!("entropy source unavailable: {}", e))
                })
            }),
        }
    }

    /// Fill `matrix` with generators built by `make_rng(worker_index)`.
    ///
    /// `make_rng` runs on the worker's own thread at worker start.
    pub fn run_with<R, F>(
        &self,
        matrix: &mut Matrix,
        progress: &ProgressTracker,
        make_rng: F,
    ) -> Result<Duration>
    where
        R: Rng,
        F: Fn(usize) -> Result<R> + Sync,
    {
        let FillOptions {
            workers, max_value, ..
        } = self.options;
        if workers == 0 {
            return Err(DiagfillError::config("worker count must be >= 1"));
        }
        if workers > MAX_WORKERS {
            return Err(DiagfillError::config(format!(
                "worker count must be <= {}",
                MAX_WORKERS
            )));
        }
        if matrix.is_empty() {
            return Err(DiagfillError::config("matrix size must be >= 1"));
        }
        let dist = cell_distribution(max_value)?;

        let size = matrix.size();
        let ranges = partition(size, workers);
        let blocks = matrix.split_rows_mut(&ranges)?;

        let _span = info_span!("fill_matrix", size, workers, max_value).entered();
        let make_rng = &make_rng;
        let start = Instant::now();

        let first_failure = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            let mut first_failure: Option<DiagfillError> = None;

            for (worker, (range, block)) in ranges.iter().copied().zip(blocks).enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("fill-worker-{}", worker))
                    .spawn_scoped(scope, move || -> Result<()> {
                        debug!(worker, start = range.start, end = range.end, "worker started");
                        let rng = make_rng(worker)?;
                        RowFiller::new(worker, range, size, dist, rng).fill(block, progress)?;
                        debug!(worker, rows = range.len(), "worker finished");
                        Ok(())
                    });

                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(e) => {
                        // Workers already running are still joined below
                        warn!(worker, error = %e, "failed to spawn fill worker");
                        first_failure = Some(DiagfillError::worker(
                            worker,
                            format!("failed to spawn thread: {}", e),
                        ));
                        break;
                    }
                }
            }

            for (worker, handle) in handles {
                let outcome = match handle.join() {
                    Ok(result) => result,
                    Err(payload) => Err(DiagfillError::worker(
                        worker,
                        format!("panicked: {}", panic_message(payload.as_ref())),
                    )),
                };
                if let Err(e) = outcome {
                    warn!(worker, error = %e, "fill worker failed");
                    first_failure.get_or_insert(e);
                }
            }
            first_failure
        });

        let elapsed = start.elapsed();
        if let Some(e) = first_failure {
            return Err(e);
        }

        progress.drain();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "fill complete");
        Ok(elapsed)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
