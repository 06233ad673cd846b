//! Parsers for the `/proc` files feeding node-level readings.
//!
//! These are pure functions over file content, testable with string inputs.

use std::fmt;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Memory figures from `/proc/meminfo`, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total: u64,
    pub available: u64,
}

impl MemInfo {
    /// Used RAM in bytes.
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }
}

/// Parses `/proc/meminfo` content.
///
/// Values are reported by the kernel in kB and converted to bytes here.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            continue;
        };
        let Some(value) = parts.next() else {
            continue;
        };

        let value: u64 = match key {
            "MemTotal:" | "MemAvailable:" => value
                .parse()
                .map_err(|_| ParseError::new(format!("invalid {} value", key)))?,
            _ => continue,
        };

        match key {
            "MemTotal:" => info.total = value * 1024,
            "MemAvailable:" => info.available = value * 1024,
            _ => {}
        }
    }

    if info.total == 0 {
        return Err(ParseError::new("MemTotal missing"));
    }

    Ok(info)
}

/// Aggregate CPU time from the `cpu` line of `/proc/stat`, in jiffies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTotals {
    /// Jiffies spent doing work (total minus idle and iowait).
    pub busy: u64,
    /// All jiffies.
    pub total: u64,
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Format: `cpu user nice system idle iowait irq softirq steal ...`
pub fn parse_cpu_totals(content: &str) -> Result<CpuTotals, ParseError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| ParseError::new("cpu line missing"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().unwrap_or(0))
        .collect();

    if fields.len() < 4 {
        return Err(ParseError::new("cpu line too short"));
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3];
    let iowait = fields.get(4).copied().unwrap_or(0);

    Ok(CpuTotals {
        busy: total.saturating_sub(idle + iowait),
        total,
    })
}

/// Counts the `cpuN` lines of `/proc/stat`.
pub fn count_cpus(content: &str) -> usize {
    content
        .lines()
        .filter(|l| {
            l.strip_prefix("cpu")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .count()
}

/// CPU usage as a delta between consecutive `/proc/stat` reads.
///
/// The first read has no baseline and reports 0.
#[derive(Debug, Default)]
pub struct CpuTracker {
    prev: Option<CpuTotals>,
}

impl CpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage in percent since the previous call.
    pub fn usage_percent(&mut self, totals: CpuTotals) -> f64 {
        let prev = self.prev.replace(totals);

        let Some(prev) = prev else {
            return 0.0;
        };

        let delta_total = totals.total.saturating_sub(prev.total);
        if delta_total == 0 {
            return 0.0;
        }
        let delta_busy = totals.busy.saturating_sub(prev.busy);

        delta_busy as f64 / delta_total as f64 * 100.0
    }
}
