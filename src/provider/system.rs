//! `UsageProvider` implementation reading the host through a `FileSystem`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::model::{MonitoringData, NodeInfo, NodeMonitorParams};
use crate::monitor::{ProviderError, UsageProvider};
use crate::provider::cgroup::{CgroupCpuTracker, parse_cpu_usage_usec, parse_memory_current};
use crate::provider::fs::FileSystem;
use crate::provider::procfs::{CpuTracker, count_cpus, parse_cpu_totals, parse_meminfo};

/// CPU-delta baselines, kept behind a mutex so the trait methods stay `&self`.
#[derive(Default)]
struct TrackerState {
    node_cpu: CpuTracker,
    instance_cpu: HashMap<String, CgroupCpuTracker>,
}

/// Usage provider backed by `/proc`, cgroup v2 and statvfs.
///
/// Node-level readings come from `/proc/stat` and `/proc/meminfo`; each
/// instance is read from its cgroup directory `<cgroup_root>/<instance_id>/`.
/// Partition usage is taken from the filesystem backing the configured path.
pub struct SystemUsageProvider<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    cgroup_path: PathBuf,
    params: NodeMonitorParams,
    trackers: Mutex<TrackerState>,
}

impl<F: FileSystem> SystemUsageProvider<F> {
    /// Creates a new provider.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to the proc filesystem (usually "/proc")
    /// * `cgroup_path` - cgroup v2 hierarchy root (usually "/sys/fs/cgroup")
    /// * `params` - Node id and the partitions to watch
    pub fn new(
        fs: F,
        proc_path: impl Into<PathBuf>,
        cgroup_path: impl Into<PathBuf>,
        params: NodeMonitorParams,
    ) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            cgroup_path: cgroup_path.into(),
            params,
            trackers: Mutex::new(TrackerState::default()),
        }
    }

    fn read_proc(&self, name: &str) -> Result<String, ProviderError> {
        Ok(self.fs.read_to_string(&self.proc_path.join(name))?)
    }

    /// Refreshes the used (and, when still unset, total) size of each watched
    /// partition. A partition whose filesystem cannot be queried keeps its
    /// previous figures.
    fn refresh_disk_usage(&self, data: &mut MonitoringData) {
        for disk in data.disk.iter_mut() {
            match self.fs.usage(Path::new(&disk.path)) {
                Ok(usage) => {
                    disk.used_size = usage.used;
                    if disk.total_size == 0 {
                        disk.total_size = usage.total;
                    }
                }
                Err(e) => {
                    debug!("partition {} usage unavailable: {}", disk.name, e);
                }
            }
        }
    }
}

impl<F: FileSystem> UsageProvider for SystemUsageProvider<F> {
    fn node_info(&self) -> Result<NodeInfo, ProviderError> {
        let stat = self.read_proc("stat")?;
        let meminfo = parse_meminfo(&self.read_proc("meminfo")?)
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let mut info = NodeInfo {
            num_cpus: count_cpus(&stat),
            total_ram: meminfo.total,
            ..Default::default()
        };

        for partition in &self.params.partitions {
            let mut partition = partition.clone();
            if let Ok(usage) = self.fs.usage(Path::new(&partition.path)) {
                partition.total_size = usage.total;
            }
            info.partitions
                .push(partition)
                .map_err(|e| ProviderError::new(e.to_string()))?;
        }

        Ok(info)
    }

    fn node_monitoring_data(
        &self,
        _node_id: &str,
        data: &mut MonitoringData,
    ) -> Result<(), ProviderError> {
        let totals = parse_cpu_totals(&self.read_proc("stat")?)
            .map_err(|e| ProviderError::new(e.to_string()))?;
        let meminfo = parse_meminfo(&self.read_proc("meminfo")?)
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let mut trackers = self
            .trackers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        data.cpu = trackers.node_cpu.usage_percent(totals);
        drop(trackers);

        data.ram = meminfo.used();
        self.refresh_disk_usage(data);

        Ok(())
    }

    fn instance_monitoring_data(
        &self,
        instance_id: &str,
        data: &mut MonitoringData,
    ) -> Result<(), ProviderError> {
        let base = self.cgroup_path.join(instance_id);
        if !self.fs.exists(&base) {
            return Err(ProviderError::new(format!(
                "no cgroup for instance {}",
                instance_id
            )));
        }

        let memory = parse_memory_current(&self.fs.read_to_string(&base.join("memory.current"))?);
        let usage_usec = parse_cpu_usage_usec(&self.fs.read_to_string(&base.join("cpu.stat"))?);

        let mut trackers = self
            .trackers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        data.cpu = trackers
            .instance_cpu
            .entry(instance_id.to_string())
            .or_default()
            .usage_percent(usage_usec);
        drop(trackers);

        data.ram = memory;
        self.refresh_disk_usage(data);

        Ok(())
    }

    fn resource_config(&self) -> Result<NodeMonitorParams, ProviderError> {
        Ok(self.params.clone())
    }
}
