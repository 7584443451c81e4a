//! # Resource Monitor
//!
//! Background thread that renders a live dashboard while a fill runs.
//!
//! The monitor only reads shared state: the fill's `ProgressTracker` (visible
//! percent) and kernel counters. Workers never wait on it. Each loop
//! iteration samples resources over one interval, then renders a frame:
//! - TTY: clear the screen and redraw the dashboard
//! - non-TTY: one `[MONITOR]` key=value log line
//!
//! A failed sample skips that frame; the next iteration tries again.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::io::procfs::{ResourceSample, ResourceSampler};
use crate::utils::progress::ProgressTracker;

/// Monitor configuration
#[derive(Clone, Copy, Debug)]
pub struct MonitorConfig {
    /// Sampling and redraw period
    pub interval: Duration,
    /// Fill workers, shown on the dashboard
    pub threads_used: usize,
    /// Logical CPUs, used to scale process CPU usage
    pub cpu_threads: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            threads_used: 1,
            cpu_threads: available_cpu_threads(),
        }
    }
}

/// Logical CPU count, 1 if it cannot be determined
pub fn available_cpu_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Everything one rendered frame shows
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub threads_used: usize,
    pub cpu_threads: usize,
    pub sample: ResourceSample,
    pub percent_done: u32,
    pub elapsed_secs: f64,
}

/// Handle to the monitor thread; owns its termination flag
pub struct MonitorHandle {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Spawn the monitor thread
    pub fn spawn(progress: Arc<ProgressTracker>, config: MonitorConfig) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let is_tty = io::stderr().is_terminal();

        let handle = thread::Builder::new()
            .name("monitor".to_string())
            .spawn(move || {
                let sampler = ResourceSampler::new(config.cpu_threads);
                monitor_loop(
                    &progress,
                    &flag,
                    config,
                    |interval| sampler.sample(interval),
                    |frame| {
                        let text = if is_tty {
                            render_dashboard(frame)
                        } else {
                            render_log_line(frame)
                        };
                        let mut err = io::stderr().lock();
                        let _ = err.write_all(text.as_bytes());
                        let _ = err.flush();
                    },
                );
            })?;

        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Signal termination and wait for the thread to finish.
    ///
    /// The thread notices the flag within one interval.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        // Don't block in drop - just signal
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Sample, build a frame, emit it; repeat until `stop` is set.
///
/// `sample` blocks for one interval. A failed sample skips that frame.
fn monitor_loop<S, E>(
    progress: &ProgressTracker,
    stop: &AtomicBool,
    config: MonitorConfig,
    mut sample: S,
    mut emit: E,
) where
    S: FnMut(Duration) -> anyhow::Result<ResourceSample>,
    E: FnMut(&Frame),
{
    let start = Instant::now();

    while !stop.load(Ordering::SeqCst) {
        let sample = match sample(config.interval) {
            Ok(sample) => sample,
            Err(e) => {
                debug!(error = %e, "resource sample unavailable, skipping frame");
                continue;
            }
        };

        emit(&Frame {
            threads_used: config.threads_used,
            cpu_threads: config.cpu_threads.max(1),
            sample,
            percent_done: progress.visible_percent(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        });
    }
}

/// Clear-screen dashboard for terminals
pub fn render_dashboard(frame: &Frame) -> String {
    let s = &frame.sample;
    let bar_width = 20;
    let filled = (frame.percent_done as usize * bar_width / 100).min(bar_width);
    let bar = "=".repeat(filled) + &" ".repeat(bar_width - filled);

    format!(
        "\x1b[2J\x1b[1;1H\
         Threads used: {} of {}\n\
         \n\
         Total memory used: {} / {} Mb\n\
         Total CPU usage: {:.2}%\n\
         Process memory usage: {} Mb (peak {} Mb)\n\
         Process CPU used: {:.2}%\n\
         \n\
         [{}] Percent done: {}% | {}\n",
        frame.threads_used,
        frame.cpu_threads,
        s.used_memory_mb,
        s.total_memory_mb,
        s.system_cpu_percent,
        s.process_rss_mb,
        s.process_peak_mb,
        s.process_cpu_percent,
        bar,
        frame.percent_done,
        format_duration(frame.elapsed_secs),
    )
}

/// Single structured line for logs and pipes
pub fn render_log_line(frame: &Frame) -> String {
    let s = &frame.sample;
    format!(
        "[MONITOR] threads={}/{} mem_used_mb={} mem_total_mb={} cpu_total={:.2}% \
         rss_mb={} peak_mb={} cpu_process={:.2}% done={}% elapsed={:.0}s\n",
        frame.threads_used,
        frame.cpu_threads,
        s.used_memory_mb,
        s.total_memory_mb,
        s.system_cpu_percent,
        s.process_rss_mb,
        s.process_peak_mb,
        s.process_cpu_percent,
        frame.percent_done,
        frame.elapsed_secs,
    )
}

/// Format duration in human-readable form
pub fn format_duration(secs: f64) -> String {
    // Round once so 119.6s reads 2m0s, not 1m60s
    let whole = secs.max(0.0).round() as u64;
    if whole < 60 {
        format!("{}s", whole)
    } else if whole < 3600 {
        format!("{}m{}s", whole / 60, whole % 60)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}
