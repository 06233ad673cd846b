//! Parsers and trackers for cgroup v2 files, one cgroup per instance.

use std::time::Instant;

/// Parses a `memory.current` file.
/// Format: number (bytes)
pub fn parse_memory_current(content: &str) -> u64 {
    content.trim().parse().unwrap_or(0)
}

/// Parses the `usage_usec` field of a `cpu.stat` file.
/// Format: key value pairs, one per line
pub fn parse_cpu_usage_usec(content: &str) -> u64 {
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() == Some("usage_usec") {
            return parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
        }
    }
    0
}

/// CPU usage of one cgroup as a delta of `usage_usec` over wall time.
///
/// The first read has no baseline and reports 0.
#[derive(Debug, Default)]
pub struct CgroupCpuTracker {
    prev: Option<(u64, Instant)>,
}

impl CgroupCpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage in percent of one CPU since the previous call.
    pub fn usage_percent(&mut self, usage_usec: u64) -> f64 {
        let now = Instant::now();
        let prev = self.prev.replace((usage_usec, now));

        let Some((prev_usec, prev_at)) = prev else {
            return 0.0;
        };

        let elapsed_usec = now.duration_since(prev_at).as_micros() as u64;
        if elapsed_usec == 0 {
            return 0.0;
        }
        let delta = usage_usec.saturating_sub(prev_usec);

        delta as f64 / elapsed_usec as f64 * 100.0
    }
}
