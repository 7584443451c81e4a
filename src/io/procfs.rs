//! # Kernel Counter Reader
//!
//! Parses the Linux `/proc` text formats the resource monitor needs into
//! named-field structs, and turns two readings taken an interval apart into
//! CPU and memory figures.
//!
//! Files read:
//! - `/proc/stat` (aggregate `cpu` line): system-wide CPU time
//! - `/proc/meminfo`: system memory
//! - `/proc/self/stat`: this process's user and system CPU time
//! - `/proc/self/status`: this process's resident and peak resident memory
//!
//! Parsers return the crate error type; readers wrap I/O and parse failures
//! with `anyhow` context. A failed read only costs the monitor one frame.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::error::DiagfillError;

/// Kernel clock ticks per second used by `/proc` (USER_HZ)
pub const CLOCK_TICKS_PER_SEC: u64 = 100;

/// Aggregate CPU time from the first line of `/proc/stat`, in clock ticks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuStat {
    /// Parse a `cpu  <user> <nice> <system> <idle> ...` line.
    ///
    /// Older kernels print fewer columns; missing trailing fields are zero.
    pub fn parse_line(line: &str) -> std::result::Result<Self, DiagfillError> {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some(label) if label.starts_with("cpu") => {}
            _ => return Err(DiagfillError::parse(1, "expected a cpu line")),
        }

        let values = fields
            .map(|f| {
                f.parse::<u64>()
                    .map_err(|e| DiagfillError::parse(1, format!("bad cpu field {:?}: {}", f, e)))
            })
            .collect::<std::result::Result<Vec<u64>, _>>()?;
        if values.len() < 4 {
            return Err(DiagfillError::parse(
                1,
                format!("cpu line has {} fields, need at least 4", values.len()),
            ));
        }

        let field = |i: usize| values.get(i).copied().unwrap_or(0);
        Ok(Self {
            user: field(0),
            nice: field(1),
            system: field(2),
            idle: field(3),
            iowait: field(4),
            irq: field(5),
            softirq: field(6),
            steal: field(7),
            guest: field(8),
            guest_nice: field(9),
        })
    }

    /// All CPU time. Guest time is already counted in `user` and `nice`.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    pub fn busy(&self) -> u64 {
        self.total().saturating_sub(self.idle_total())
    }

    /// Share of non-idle time since `earlier`, in percent
    pub fn busy_percent_since(&self, earlier: &CpuStat) -> f64 {
        let total = self.total().saturating_sub(earlier.total());
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy().saturating_sub(earlier.busy());
        busy as f64 / total as f64 * 100.0
    }
}

/// System memory from `/proc/meminfo`, in kB
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: Option<u64>,
}

impl MemInfo {
    pub fn parse(text: &str) -> std::result::Result<Self, DiagfillError> {
        let mut total = None;
        let mut free = None;
        let mut available = None;
        for (idx, line) in text.lines().enumerate() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let slot = match key.trim() {
                "MemTotal" => &mut total,
                "MemFree" => &mut free,
                "MemAvailable" => &mut available,
                _ => continue,
            };
            *slot = Some(parse_kb(rest, idx + 1)?);
        }

        Ok(Self {
            total_kb: total.ok_or_else(|| DiagfillError::parse(0, "MemTotal missing"))?,
            free_kb: free.ok_or_else(|| DiagfillError::parse(0, "MemFree missing"))?,
            available_kb: available,
        })
    }

    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }
}

/// This process's CPU time from `/proc/self/stat`, in clock ticks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessCpu {
    pub utime_ticks: u64,
    pub stime_ticks: u64,
}

impl ProcessCpu {
    /// Parse a `/proc/<pid>/stat` line.
    ///
    /// The command name (field 2) may contain spaces and parentheses, so
    /// fields are counted from the last `)`. utime and stime are fields 14 and 15.
    pub fn parse(text: &str) -> std::result::Result<Self, DiagfillError> {
        let close = text
            .rfind(')')
            .ok_or_else(|| DiagfillError::parse(1, "missing ')' after command name"))?;
        // First field after the command is field 3 (state)
        let fields: Vec<&str> = text[close + 1..].split_whitespace().collect();
        let field = |n: usize| -> std::result::Result<u64, DiagfillError> {
            let raw = fields
                .get(n - 3)
                .ok_or_else(|| DiagfillError::parse(1, format!("stat field {} missing", n)))?;
            raw.parse::<u64>()
                .map_err(|e| DiagfillError::parse(1, format!("stat field {} {:?}: {}", n, raw, e)))
        };

        Ok(Self {
            utime_ticks: field(14)?,
            stime_ticks: field(15)?,
        })
    }

    pub fn total_ticks(&self) -> u64 {
        self.utime_ticks + self.stime_ticks
    }
}

/// This process's memory from `/proc/self/status`, in kB
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    pub rss_kb: u64,
    pub peak_rss_kb: u64,
}

impl ProcessMemory {
    pub fn parse(text: &str) -> std::result::Result<Self, DiagfillError> {
        let mut rss = None;
        let mut peak = None;
        for (idx, line) in text.lines().enumerate() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            match key {
                "VmRSS" => rss = Some(parse_kb(rest, idx + 1)?),
                "VmHWM" => peak = Some(parse_kb(rest, idx + 1)?),
                _ => {}
            }
        }

        let rss_kb = rss.ok_or_else(|| DiagfillError::parse(0, "VmRSS missing"))?;
        Ok(Self {
            rss_kb,
            peak_rss_kb: peak.unwrap_or(rss_kb),
        })
    }
}

/// Parse `"   16314344 kB"`
fn parse_kb(rest: &str, line: usize) -> std::result::Result<u64, DiagfillError> {
    let value = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| DiagfillError::parse(line, "missing value"))?;
    value
        .parse::<u64>()
        .map_err(|e| DiagfillError::parse(line, format!("bad kB value {:?}: {}", value, e)))
}

fn read_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub fn read_cpu_stat() -> Result<CpuStat> {
    let text = read_file("/proc/stat")?;
    let line = text.lines().next().context("/proc/stat is empty")?;
    Ok(CpuStat::parse_line(line)?)
}

pub fn read_meminfo() -> Result<MemInfo> {
    Ok(MemInfo::parse(&read_file("/proc/meminfo")?)?)
}

pub fn read_process_cpu() -> Result<ProcessCpu> {
    Ok(ProcessCpu::parse(&read_file("/proc/self/stat")?)?)
}

pub fn read_process_memory() -> Result<ProcessMemory> {
    Ok(ProcessMemory::parse(&read_file("/proc/self/status")?)?)
}

/// CPU counters captured at one instant
#[derive(Clone, Copy, Debug)]
pub struct CpuCounters {
    pub system: CpuStat,
    pub process: ProcessCpu,
    pub at: Instant,
}

impl CpuCounters {
    pub fn read() -> Result<Self> {
        Ok(Self {
            system: read_cpu_stat()?,
            process: read_process_cpu()?,
            at: Instant::now(),
        })
    }
}

/// Resource usage over one sampling interval
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResourceSample {
    pub total_memory_mb: u64,
    pub used_memory_mb: u64,
    pub process_rss_mb: u64,
    pub process_peak_mb: u64,
    /// This process's CPU use as a share of all logical CPUs
    pub process_cpu_percent: f64,
    /// System-wide non-idle CPU time
    pub system_cpu_percent: f64,
}

impl ResourceSample {
    /// Combine two CPU readings and one memory reading into a sample
    pub fn compute(
        start: &CpuCounters,
        end: &CpuCounters,
        mem: &MemInfo,
        process_mem: &ProcessMemory,
        cpu_threads: usize,
    ) -> Self {
        let elapsed = end.at.duration_since(start.at).as_secs_f64();
        let process_secs = end
            .process
            .total_ticks()
            .saturating_sub(start.process.total_ticks()) as f64
            / CLOCK_TICKS_PER_SEC as f64;
        let process_cpu_percent = if elapsed > 0.0 {
            process_secs / elapsed / cpu_threads.max(1) as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_memory_mb: mem.total_kb / 1024,
            used_memory_mb: mem.used_kb() / 1024,
            process_rss_mb: process_mem.rss_kb / 1024,
            process_peak_mb: process_mem.peak_rss_kb / 1024,
            process_cpu_percent,
            system_cpu_percent: end.system.busy_percent_since(&start.system),
        }
    }
}

/// Takes one `ResourceSample` per call, blocking for the sampling interval
#[derive(Clone, Copy, Debug)]
pub struct ResourceSampler {
    cpu_threads: usize,
}

impl ResourceSampler {
    pub fn new(cpu_threads: usize) -> Self {
        Self {
            cpu_threads: cpu_threads.max(1),
        }
    }

    pub fn cpu_threads(&self) -> usize {
        self.cpu_threads
    }

    /// Read counters, sleep `interval`, read again.
    ///
    /// Always sleeps the full interval, even when the first read fails, so a
    /// caller polling in a loop keeps its cadence.
    pub fn sample(&self, interval: Duration) -> Result<ResourceSample> {
        let start = CpuCounters::read();
        thread::sleep(interval);
        let end = CpuCounters::read();

        let start = start.context("reading starting CPU counters")?;
        let end = end.context("reading ending CPU counters")?;
        let mem = read_meminfo()?;
        let process_mem = read_process_memory()?;
        Ok(ResourceSample::compute(
            &start,
            &end,
            &mem,
            &process_mem,
            self.cpu_threads,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_LINE: &str = "cpu  376589 2129 99210 7415704 10041 0 61485 0 0 0";

    #[test]
    fn test_parse_cpu_line() {
        let stat = CpuStat::parse_line(STAT_LINE).unwrap();
        assert_eq!(stat.user, 376589);
        assert_eq!(stat.nice, 2129);
        assert_eq!(stat.system, 99210);
        assert_eq!(stat.idle, 7415704);
        assert_eq!(stat.iowait, 10041);
        assert_eq!(stat.irq, 0);
        assert_eq!(stat.softirq, 61485);
        assert_eq!(stat.guest_nice, 0);
        assert_eq!(stat.total(), 376589 + 2129 + 99210 + 7415704 + 10041 + 61485);
        assert_eq!(stat.idle_total(), 7415704 + 10041);
    }

    #[test]
    fn test_parse_short_cpu_line() {
        let stat = CpuStat::parse_line("cpu 10 20 30 40").unwrap();
        assert_eq!(stat.idle, 40);
        assert_eq!(stat.iowait, 0);
        assert_eq!(stat.steal, 0);
    }

    #[test]
    fn test_parse_cpu_line_rejects_garbage() {
        assert!(CpuStat::parse_line("intr 1 2 3 4").is_err());
        assert!(CpuStat::parse_line("cpu 1 2 3").is_err());
        assert!(CpuStat::parse_line("cpu 1 2 x 4").is_err());
        assert!(CpuStat::parse_line("").is_err());
    }

    #[test]
    fn test_busy_percent() {
        let a = CpuStat {
            user: 100,
            idle: 100,
            ..Default::default()
        };
        let b = CpuStat {
            user: 175,
            idle: 125,
            ..Default::default()
        };
        assert!((b.busy_percent_since(&a) - 75.0).abs() < 1e-9);
        assert_eq!(a.busy_percent_since(&a), 0.0);
    }

    #[test]
    fn test_parse_meminfo() {
        let text = "MemTotal:       16314344 kB\n\
                    MemFree:         2048000 kB\n\
                    MemAvailable:    8192000 kB\n\
                    Buffers:          123456 kB\n";
        let mem = MemInfo::parse(text).unwrap();
        assert_eq!(mem.total_kb, 16314344);
        assert_eq!(mem.free_kb, 2048000);
        assert_eq!(mem.available_kb, Some(8192000));
        assert_eq!(mem.used_kb(), 16314344 - 2048000);

        assert!(MemInfo::parse("MemFree: 1 kB\n").is_err());
        assert!(MemInfo::parse("MemTotal: lots kB\nMemFree: 1 kB\n").is_err());
    }

    #[test]
    fn test_parse_process_stat() {
        // Command name with spaces and parentheses
        let text = "4242 (my (odd) proc) R 1 4242 4242 0 -1 4194304 500 0 0 0 \
                    321 45 0 0 20 0 9 0 123456 1000000 250 18446744073709551615";
        let cpu = ProcessCpu::parse(text).unwrap();
        assert_eq!(cpu.utime_ticks, 321);
        assert_eq!(cpu.stime_ticks, 45);
        assert_eq!(cpu.total_ticks(), 366);

        assert!(ProcessCpu::parse("4242 no-parens R 1").is_err());
        assert!(ProcessCpu::parse("4242 (short) R 1 2").is_err());
    }

    #[test]
    fn test_parse_process_status() {
        let text = "Name:\tdiagfill\nVmHWM:\t   20480 kB\nVmRSS:\t   10240 kB\nThreads:\t9\n";
        let mem = ProcessMemory::parse(text).unwrap();
        assert_eq!(mem.rss_kb, 10240);
        assert_eq!(mem.peak_rss_kb, 20480);

        assert!(ProcessMemory::parse("Name:\tdiagfill\n").is_err());
    }

    #[test]
    fn test_compute_sample() {
        let t0 = Instant::now();
        let start = CpuCounters {
            system: CpuStat {
                user: 1000,
                idle: 1000,
                ..Default::default()
            },
            process: ProcessCpu {
                utime_ticks: 0,
                stime_ticks: 0,
            },
            at: t0,
        };
        let end = CpuCounters {
            system: CpuStat {
                user: 1300,
                idle: 1100,
                ..Default::default()
            },
            // 2 CPU-seconds of work over 1 wall second on 4 threads = 50%
            process: ProcessCpu {
                utime_ticks: 180,
                stime_ticks: 20,
            },
            at: t0 + Duration::from_secs(1),
        };
        let mem = MemInfo {
            total_kb: 8 * 1024 * 1024,
            free_kb: 2 * 1024 * 1024,
            available_kb: None,
        };
        let process_mem = ProcessMemory {
            rss_kb: 512 * 1024,
            peak_rss_kb: 600 * 1024,
        };

        let s = ResourceSample::compute(&start, &end, &mem, &process_mem, 4);
        assert_eq!(s.total_memory_mb, 8192);
        assert_eq!(s.used_memory_mb, 6144);
        assert_eq!(s.process_rss_mb, 512);
        assert_eq!(s.process_peak_mb, 600);
        assert!((s.process_cpu_percent - 50.0).abs() < 1e-9);
        assert!((s.system_cpu_percent - 75.0).abs() < 1e-9);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_live_counters() {
        assert!(read_cpu_stat().unwrap().total() > 0);
        assert!(read_meminfo().unwrap().total_kb > 0);
        assert!(read_process_memory().unwrap().rss_kb > 0);
        read_process_cpu().unwrap();
    }
}
