//! Capacity bounds and monitoring cadence defaults.
//!
//! These are resource-contract knobs, not behavioral switches: the bounded
//! lists in the data model are sized by the `MAX_*` constants, and the two
//! monitor timers default to the `DEFAULT_*` intervals.

use std::time::Duration;

/// Max number of disk partitions tracked per node or per instance.
pub const MAX_PARTITIONS: usize = 4;

/// Max number of type tags per partition.
pub const MAX_PARTITION_TYPES: usize = 4;

/// Max number of concurrently monitored instances.
pub const MAX_INSTANCES: usize = 16;

/// Max node id length in bytes.
pub const NODE_ID_LEN: usize = 64;

/// Max instance id length in bytes.
pub const INSTANCE_ID_LEN: usize = 40;

/// Max partition name length in bytes.
pub const PARTITION_NAME_LEN: usize = 64;

/// Max partition type tag length in bytes.
pub const PARTITION_TYPES_LEN: usize = 32;

/// Default interval between usage gathering passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default interval between snapshot sends.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(10_000);

/// Cadence configuration for the resource monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Interval between usage gathering passes.
    pub poll_interval: Duration,
    /// Interval between snapshot sends (once send monitoring is started).
    pub send_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            send_interval: DEFAULT_SEND_INTERVAL,
        }
    }
}
