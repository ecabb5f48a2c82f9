//! Host and process memory readers backing the metrics subsystem.
//!
//! Both read procfs, so they only produce data on Linux; elsewhere the first
//! read fails and the metrics subsystem reports it like any other startup
//! failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{LookoutError, Result};
use crate::telemetry::subsystem::Subsystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub resident: u64,
    pub virtual_size: u64,
    pub open_fds: u64,
}

/// Point-in-time system memory, in bytes
pub trait MemorySampler: Send + Sync + 'static {
    fn sample(&self) -> Result<MemorySnapshot>;
}

/// Point-in-time stats of the current process
pub trait ProcessSampler: Send + Sync + 'static {
    fn sample(&self) -> Result<ProcessSnapshot>;
}

fn read_failure(path: &Path, err: impl std::fmt::Display) -> LookoutError {
    LookoutError::instrumentation(
        Subsystem::Metrics,
        format!("failed to read {}: {err}", path.display()),
    )
}

/// Reads `/proc/meminfo`
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl ProcMeminfo {
    pub fn new() -> Self {
        Self::from_path("/proc/meminfo")
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcMeminfo {
    fn sample(&self) -> Result<MemorySnapshot> {
        let text = fs::read_to_string(&self.path).map_err(|e| read_failure(&self.path, e))?;
        parse_meminfo(&text).map_err(|reason| read_failure(&self.path, reason))
    }
}

/// Used memory follows the classic `total - free - buffers - cached` rule,
/// with reclaimable slab counted as cache.
pub fn parse_meminfo(text: &str) -> std::result::Result<MemorySnapshot, String> {
    let mut total = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;
    let mut reclaimable = 0u64;

    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kib) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        let bytes = kib.saturating_mul(1024);
        match key.trim() {
            "MemTotal" => total = Some(bytes),
            "MemFree" => free = bytes,
            "Buffers" => buffers = bytes,
            "Cached" => cached = bytes,
            "SReclaimable" => reclaimable = bytes,
            _ => {}
        }
    }

    let total = total.ok_or_else(|| "MemTotal missing".to_string())?;
    let used = total
        .saturating_sub(free)
        .saturating_sub(buffers)
        .saturating_sub(cached)
        .saturating_sub(reclaimable);
    Ok(MemorySnapshot { total, used })
}

/// Reads `status` and counts `fd` entries under a procfs process directory
#[derive(Debug, Clone)]
pub struct ProcSelf {
    dir: PathBuf,
}

impl ProcSelf {
    pub fn new() -> Self {
        Self::from_dir("/proc/self")
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for ProcSelf {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler for ProcSelf {
    fn sample(&self) -> Result<ProcessSnapshot> {
        let status_path = self.dir.join("status");
        let status = fs::read_to_string(&status_path).map_err(|e| read_failure(&status_path, e))?;
        let (virtual_size, resident) =
            parse_status(&status).map_err(|reason| read_failure(&status_path, reason))?;

        let fd_path = self.dir.join("fd");
        let open_fds = fs::read_dir(&fd_path).map_err(|e| read_failure(&fd_path, e))?.count();

        Ok(ProcessSnapshot { resident, virtual_size, open_fds: open_fds as u64 })
    }
}

/// `VmSize` and `VmRSS` from a `status` file, in bytes. Both are reported in
/// kB, so the host page size does not matter.
fn parse_status(text: &str) -> std::result::Result<(u64, u64), String> {
    let mut size = None;
    let mut resident = None;
    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "VmSize" => &mut size,
            "VmRSS" => &mut resident,
            _ => continue,
        };
        *slot = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|kib| kib.saturating_mul(1024));
    }
    match (size, resident) {
        (Some(size), Some(resident)) => Ok((size, resident)),
        _ => Err("VmSize or VmRSS missing".to_string()),
    }
}

/// Process stats cached for a minimum interval, so several gauges read in
/// the same collection share one procfs read.
pub struct RuntimeCollector {
    sampler: Arc<dyn ProcessSampler>,
    min_interval: Duration,
    started: Instant,
    cache: Mutex<Option<(Instant, ProcessSnapshot)>>,
}

impl RuntimeCollector {
    pub fn new(sampler: Arc<dyn ProcessSampler>, min_interval: Duration) -> Self {
        Self { sampler, min_interval, started: Instant::now(), cache: Mutex::new(None) }
    }

    pub fn snapshot(&self) -> Result<ProcessSnapshot> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((read_at, snapshot)) = *cache {
            if read_at.elapsed() < self.min_interval {
                return Ok(snapshot);
            }
        }
        let snapshot = self.sampler.sample()?;
        *cache = Some((Instant::now(), snapshot));
        Ok(snapshot)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
