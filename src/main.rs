//! # diagfill: Concurrent Diagonal-Sum Matrix Fill
//!
//! Fills an `N x N` matrix with random off-diagonal values on a fixed number of
//! worker threads, writing each row's sum into its diagonal, while a monitor
//! thread shows CPU, memory, and progress once per interval.
//!
//! ## Usage
//! ```bash
//! # 8 workers, 10000 x 10000, values in [0, 100000]
//! diagfill 8 10000
//!
//! # Reproducible fill, checked afterwards, with span timings
//! diagfill 8 10000 500 --seed 42 --verify --profile
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use diagfill::config::{exit_status, Config, USAGE};
use diagfill::pipelines::FillEngine;
use diagfill::utils::progress::ProgressTracker;
use diagfill::utils::telemetry::{available_cpu_threads, MonitorConfig, MonitorHandle};
use diagfill::{DiagfillError, Matrix, Result};

fn main() -> ExitCode {
    let result = run();
    match &result {
        Ok(()) => {}
        Err(e) if e.is_config() => {
            eprintln!("{}", e);
            println!("{}", USAGE);
        }
        Err(e) => eprintln!("Error: {}", e),
    }
    ExitCode::from(exit_status(&result))
}

/// Initialize tracing subscriber for hierarchical profiling output
fn init_profiling() {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Warnings only, unless `RUST_LOG` says otherwise
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let config = Config::parse_and_validate()?;

    if config.profile {
        init_profiling();
        eprintln!("=== Profiling enabled ===\n");
    } else {
        init_logging();
    }

    let size = config.matrix_size();
    let cpu_threads = available_cpu_threads();
    eprintln!("diagfill v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "Threads: {} (of {}) | Matrix: {}x{} | Max value: {}",
        config.workers(),
        cpu_threads,
        size,
        size,
        config.max_value()
    );

    let mut matrix = Matrix::new(size)?;
    let progress = Arc::new(ProgressTracker::new(size as u64));

    let monitor = if config.no_monitor {
        None
    } else {
        Some(MonitorHandle::spawn(
            Arc::clone(&progress),
            MonitorConfig {
                interval: config.monitor_interval(),
                threads_used: config.workers(),
                cpu_threads,
            },
        )?)
    };

    let engine = FillEngine::new(config.fill_options());
    let result = engine.run(&mut matrix, &progress);

    // Stop the monitor whether or not the fill succeeded
    if let Some(monitor) = monitor {
        monitor.shutdown();
    }
    let elapsed = result?;

    if config.verify {
        if let Some(row) = matrix.verify_row_sums() {
            return Err(DiagfillError::Invariant { row });
        }
        eprintln!("Verified row sums for {} rows", size);
    }

    println!("\n\nFunction executed in: {}ms", elapsed.as_millis());
    Ok(())
}
