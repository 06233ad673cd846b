//! edgemon — resource telemetry core for an edge-node agent.
//!
//! Provides:
//! - `config` — capacity bounds and monitoring cadence defaults
//! - `model` — monitoring data model (node, instances, partitions)
//! - `monitor` — the resource monitor: gather/send loops, instance registry
//! - `provider` — system usage provider backed by `/proc` and cgroup v2
//! - `sender` — wire sender that forwards snapshots to a remote collector
//! - `util` — helper utilities (bounded containers)

pub mod config;
pub mod model;
pub mod monitor;
pub mod provider;
pub mod sender;
pub mod util;
