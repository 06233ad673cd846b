//! Error type for resource monitor operations.

use std::fmt;

use crate::monitor::timer::TimerError;
use crate::monitor::traits::ProviderError;
use crate::util::CapacityError;

/// Errors surfaced by [`crate::monitor::ResourceMonitor`] operations.
///
/// Per-cycle sample and send failures never appear here: they are logged by
/// the loops and the monitor stays live.
#[derive(Debug)]
pub enum MonitorError {
    /// The usage provider failed to supply the initial configuration.
    /// Fatal to construction.
    Config(ProviderError),
    /// A bounded list is full; the registry is unchanged.
    Capacity(CapacityError),
    /// An id exceeds its configured length bound.
    IdTooLong { len: usize, max: usize },
    /// `stop_instance_monitoring` on an id that was never registered.
    InstanceNotFound(String),
    /// The timer subsystem rejected an arm/disarm request.
    Timer(TimerError),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Config(e) => write!(f, "resource config unavailable: {}", e),
            MonitorError::Capacity(e) => write!(f, "{}", e),
            MonitorError::IdTooLong { len, max } => {
                write!(f, "id length {} exceeds bound {}", len, max)
            }
            MonitorError::InstanceNotFound(id) => write!(f, "instance {} not monitored", id),
            MonitorError::Timer(e) => write!(f, "timer error: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Config(e) => Some(e),
            MonitorError::Capacity(e) => Some(e),
            MonitorError::Timer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CapacityError> for MonitorError {
    fn from(e: CapacityError) -> Self {
        MonitorError::Capacity(e)
    }
}

impl From<TimerError> for MonitorError {
    fn from(e: TimerError) -> Self {
        MonitorError::Timer(e)
    }
}
