//! Monitoring data model.
//!
//! All list-valued fields are fixed-capacity (`BoundedVec`), sized by the
//! constants in [`crate::config`]. The same `PartitionInfo` type serves both
//! as static configuration (name, path, type tags, total size) and as a live
//! sample (used size).

use serde::{Deserialize, Serialize};

use crate::config::{MAX_INSTANCES, MAX_PARTITION_TYPES, MAX_PARTITIONS};
use crate::util::BoundedVec;

/// A monitored disk partition: static description plus the latest usage
/// sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub name: String,
    /// Filesystem path the partition is mounted at.
    pub path: String,
    /// Type tags (e.g. "state", "storage").
    pub types: BoundedVec<String, MAX_PARTITION_TYPES>,
    /// Total size in bytes.
    pub total_size: u64,
    /// Used size in bytes, refreshed every gather cycle.
    pub used_size: u64,
}

/// Static node capability description, queried once from the usage provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub num_cpus: usize,
    /// Total RAM in bytes.
    pub total_ram: u64,
    pub partitions: BoundedVec<PartitionInfo, MAX_PARTITIONS>,
}

/// One current reading for the node or for a single instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringData {
    /// CPU usage in percent.
    pub cpu: f64,
    /// RAM usage in bytes.
    pub ram: u64,
    /// Per-partition disk samples.
    pub disk: BoundedVec<PartitionInfo, MAX_PARTITIONS>,
}

/// Identity of a workload instance. Immutable after registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdent {
    pub service_id: String,
    pub subject_id: String,
    pub instance: u64,
}

/// Monitoring data for one registered instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMonitoringData {
    pub instance_id: String,
    pub ident: InstanceIdent,
    /// Overwritten in place every gather cycle.
    pub monitoring_data: MonitoringData,
}

impl InstanceMonitoringData {
    pub fn new(instance_id: impl Into<String>, ident: InstanceIdent, data: MonitoringData) -> Self {
        Self {
            instance_id: instance_id.into(),
            ident,
            monitoring_data: data,
        }
    }
}

/// The shared snapshot: node-level data plus all instance samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMonitoringData {
    pub node_id: String,
    pub monitoring_data: MonitoringData,
    /// Sample timestamp, seconds since the Unix epoch.
    pub timestamp: i64,
    pub instances: BoundedVec<InstanceMonitoringData, MAX_INSTANCES>,
}

/// Registration payload for one instance: identity plus the partitions to
/// watch. Copied into the live structures, not retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceMonitorParams {
    pub ident: InstanceIdent,
    pub partitions: BoundedVec<PartitionInfo, MAX_PARTITIONS>,
}

/// Node-level monitoring configuration supplied by the usage provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMonitorParams {
    pub node_id: String,
    pub partitions: BoundedVec<PartitionInfo, MAX_PARTITIONS>,
}
