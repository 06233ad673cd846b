//! Capability boundaries of the resource monitor.
//!
//! The monitor never reads the system or the network itself: usage comes in
//! through [`UsageProvider`], snapshots go out through [`MonitoringSender`].
//! Test doubles substitute for both directly.

use std::fmt;

use crate::model::{MonitoringData, NodeInfo, NodeMonitorParams, NodeMonitoringData};

/// Error reported by a usage provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider error: {}", self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Error reported by a monitoring sender.
#[derive(Debug)]
pub enum SendError {
    /// Transport failure delivering the snapshot.
    Io(std::io::Error),
    /// Snapshot could not be encoded for the wire.
    Encode(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Io(e) => write!(f, "I/O error: {}", e),
            SendError::Encode(msg) => write!(f, "encode error: {}", msg),
        }
    }
}

impl std::error::Error for SendError {}

impl From<std::io::Error> for SendError {
    fn from(e: std::io::Error) -> Self {
        SendError::Io(e)
    }
}

/// Source of node and instance usage readings.
///
/// Called synchronously from the monitor's loops and lifecycle; an
/// implementation must not call back into the monitor.
pub trait UsageProvider: Send + Sync {
    /// Static node capability description.
    fn node_info(&self) -> Result<NodeInfo, ProviderError>;

    /// Refreshes node-level usage in place.
    ///
    /// `data.disk` arrives pre-populated with the configured partitions; the
    /// provider updates usage figures and leaves the rest untouched, so a
    /// failed read never clobbers the previous sample.
    fn node_monitoring_data(
        &self,
        node_id: &str,
        data: &mut MonitoringData,
    ) -> Result<(), ProviderError>;

    /// Refreshes usage of one instance in place. Same contract as
    /// [`UsageProvider::node_monitoring_data`].
    fn instance_monitoring_data(
        &self,
        instance_id: &str,
        data: &mut MonitoringData,
    ) -> Result<(), ProviderError>;

    /// Node monitoring configuration (node id, watched partitions).
    fn resource_config(&self) -> Result<NodeMonitorParams, ProviderError>;
}

/// Consumer of assembled snapshots.
pub trait MonitoringSender: Send + Sync {
    /// Delivers one snapshot. Failures are reported once; the monitor never
    /// retries a send.
    fn send_monitoring_data(&self, data: &NodeMonitoringData) -> Result<(), SendError>;
}
