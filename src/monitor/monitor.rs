//! The resource monitor: shared snapshot, instance registry, and the two
//! background loops.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::config::{INSTANCE_ID_LEN, MonitorConfig, NODE_ID_LEN};
use crate::model::{
    InstanceMonitorParams, InstanceMonitoringData, MonitoringData, NodeInfo, NodeMonitoringData,
};
use crate::monitor::error::MonitorError;
use crate::monitor::timer::RepeatingTimer;
use crate::monitor::traits::{MonitoringSender, ProviderError, UsageProvider};
use crate::util::BoundedVec;

/// Mutable state guarded by the shared lock.
struct MonitorState {
    data: NodeMonitoringData,
    gather_due: bool,
    send_due: bool,
    shutdown: bool,
}

/// State shared between the monitor, its loops and its timer callbacks.
struct Shared {
    provider: Arc<dyn UsageProvider>,
    sender: Arc<dyn MonitoringSender>,
    state: Mutex<MonitorState>,
    wake: Condvar,
}

impl Shared {
    /// Acquires the state lock, recovering from poisoning.
    ///
    /// The guarded state holds no partially applied transitions, so a
    /// recovered guard is always consistent.
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("monitor state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Gatherer loop: waits for its due-flag or shutdown, then refreshes the
    /// node sample and every instance sample from the usage provider.
    ///
    /// A failed read is logged and skipped; it neither aborts the pass nor
    /// touches the previous sample of the failing entry.
    fn gather_loop(&self) {
        loop {
            let mut state = self.lock_state();
            while !state.shutdown && !state.gather_due {
                state = self.wake.wait(state).unwrap_or_else(|poisoned| {
                    warn!("monitor state lock poisoned during wait, recovering");
                    poisoned.into_inner()
                });
            }
            if state.shutdown {
                break;
            }
            state.gather_due = false;

            debug!("gather monitoring data");

            state.data.timestamp = Utc::now().timestamp();

            let node_id = state.data.node_id.clone();
            if let Err(e) = self
                .provider
                .node_monitoring_data(&node_id, &mut state.data.monitoring_data)
            {
                warn!("failed to gather node monitoring data: {}", e);
            }

            for instance in state.data.instances.iter_mut() {
                if let Err(e) = self
                    .provider
                    .instance_monitoring_data(&instance.instance_id, &mut instance.monitoring_data)
                {
                    warn!(
                        "failed to gather monitoring data for instance {}: {}",
                        instance.instance_id, e
                    );
                }
            }
        }

        debug!("gatherer loop terminated");
    }

    /// Sender loop: waits for its due-flag or shutdown, clones the snapshot
    /// under the lock and delivers the copy outside it.
    ///
    /// The clone-under-lock hand-off keeps the gatherer from mutating a
    /// snapshot mid-send; a slow sender stalls only its own cadence.
    fn send_loop(&self) {
        loop {
            let mut state = self.lock_state();
            while !state.shutdown && !state.send_due {
                state = self.wake.wait(state).unwrap_or_else(|poisoned| {
                    warn!("monitor state lock poisoned during wait, recovering");
                    poisoned.into_inner()
                });
            }
            if state.shutdown {
                break;
            }
            state.send_due = false;

            debug!("send monitoring data");

            let snapshot = state.data.clone();
            drop(state);

            if let Err(e) = self.sender.send_monitoring_data(&snapshot) {
                warn!("failed to send monitoring data: {}", e);
            }
        }

        debug!("sender loop terminated");
    }
}

/// Periodically samples node and instance resource usage and forwards the
/// assembled snapshot to a remote collector.
///
/// Construction starts gathering immediately; sending is toggled separately
/// via [`ResourceMonitor::start_send_monitoring`]. Dropping the monitor
/// drains both loops before any field is torn down.
pub struct ResourceMonitor {
    shared: Arc<Shared>,
    gather_timer: Mutex<RepeatingTimer>,
    send_timer: Mutex<RepeatingTimer>,
    send_interval: Duration,
    gather_handle: Option<JoinHandle<()>>,
    send_handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    /// Creates the monitor and starts gathering.
    ///
    /// Queries the provider for the node monitoring configuration (failure is
    /// fatal), seeds the shared snapshot with the node id and the configured
    /// partition list, arms the gather timer and spawns both loops.
    pub fn new(
        provider: Arc<dyn UsageProvider>,
        sender: Arc<dyn MonitoringSender>,
        config: MonitorConfig,
    ) -> Result<Self, MonitorError> {
        debug!("init resource monitor");

        let params = provider.resource_config().map_err(MonitorError::Config)?;
        if params.node_id.len() > NODE_ID_LEN {
            return Err(MonitorError::IdTooLong {
                len: params.node_id.len(),
                max: NODE_ID_LEN,
            });
        }

        let mut data = NodeMonitoringData {
            node_id: params.node_id,
            ..Default::default()
        };
        for partition in &params.partitions {
            data.monitoring_data.disk.push(partition.clone())?;
        }

        let shared = Arc::new(Shared {
            provider,
            sender,
            state: Mutex::new(MonitorState {
                data,
                gather_due: false,
                send_due: false,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let gather_shared = Arc::clone(&shared);
        let gather_handle = thread::spawn(move || gather_shared.gather_loop());

        let send_shared = Arc::clone(&shared);
        let send_handle = thread::spawn(move || send_shared.send_loop());

        let mut gather_timer = RepeatingTimer::new();
        let timer_shared = Arc::clone(&shared);
        gather_timer.start(config.poll_interval, false, move || {
            let mut state = timer_shared.lock_state();
            state.gather_due = true;
            timer_shared.wake.notify_all();
        })?;

        Ok(Self {
            shared,
            gather_timer: Mutex::new(gather_timer),
            send_timer: Mutex::new(RepeatingTimer::new()),
            send_interval: config.send_interval,
            gather_handle: Some(gather_handle),
            send_handle: Some(send_handle),
        })
    }

    /// Arms the send timer. Gathering runs regardless; sending is a
    /// separately toggled feature.
    pub fn start_send_monitoring(&self) -> Result<(), MonitorError> {
        debug!("start send monitoring");

        let mut timer = self
            .send_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let shared = Arc::clone(&self.shared);
        timer.start(self.send_interval, false, move || {
            let mut state = shared.lock_state();
            state.send_due = true;
            shared.wake.notify_all();
        })?;

        Ok(())
    }

    /// Disarms the send timer.
    pub fn stop_send_monitoring(&self) -> Result<(), MonitorError> {
        debug!("stop send monitoring");

        let mut timer = self
            .send_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        timer.stop()?;

        Ok(())
    }

    /// Static node description, passed straight through from the usage
    /// provider. Never touches the shared snapshot.
    pub fn node_info(&self) -> Result<NodeInfo, ProviderError> {
        debug!("get node info");

        self.shared.provider.node_info()
    }

    /// A point-in-time copy of the current snapshot.
    pub fn snapshot(&self) -> NodeMonitoringData {
        self.shared.lock_state().data.clone()
    }

    /// Registers an instance for monitoring, or updates an existing
    /// registration.
    ///
    /// A new id is appended with the identity and partition list from
    /// `params` (capacity overflow leaves the registry unchanged). A known
    /// id has only its partition list replaced: identity and current usage
    /// numbers are untouched.
    pub fn start_instance_monitoring(
        &self,
        instance_id: &str,
        params: InstanceMonitorParams,
    ) -> Result<(), MonitorError> {
        if instance_id.len() > INSTANCE_ID_LEN {
            return Err(MonitorError::IdTooLong {
                len: instance_id.len(),
                max: INSTANCE_ID_LEN,
            });
        }

        let mut disk = BoundedVec::new();
        for partition in &params.partitions {
            disk.push(partition.clone())?;
        }

        let mut state = self.shared.lock_state();

        debug!("start instance monitoring: {}", instance_id);

        if let Some(existing) = state
            .data
            .instances
            .find_mut(|i| i.instance_id == instance_id)
        {
            existing.monitoring_data.disk = disk;
            return Ok(());
        }

        let entry = InstanceMonitoringData::new(
            instance_id,
            params.ident,
            MonitoringData {
                disk,
                ..Default::default()
            },
        );
        state.data.instances.push(entry)?;

        Ok(())
    }

    /// Removes an instance from monitoring. Unknown ids are an error: a
    /// removal that matches nothing signals caller misuse.
    pub fn stop_instance_monitoring(&self, instance_id: &str) -> Result<(), MonitorError> {
        let mut state = self.shared.lock_state();

        debug!("stop instance monitoring: {}", instance_id);

        state
            .data
            .instances
            .remove_first(|i| i.instance_id == instance_id)
            .map(drop)
            .ok_or_else(|| MonitorError::InstanceNotFound(instance_id.to_string()))
    }
}

impl Drop for ResourceMonitor {
    /// Shutdown protocol: flag + broadcast under the lock, join both loops,
    /// then best-effort timer teardown. No loop touches shared state after
    /// the joins return.
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock_state();
            state.shutdown = true;
            self.shared.wake.notify_all();
        }

        if let Some(handle) = self.gather_handle.take()
            && handle.join().is_err()
        {
            error!("gatherer loop panicked");
        }
        if let Some(handle) = self.send_handle.take()
            && handle.join().is_err()
        {
            error!("sender loop panicked");
        }

        let mut gather_timer = self
            .gather_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if gather_timer.is_armed()
            && let Err(e) = gather_timer.stop()
        {
            error!("failed to stop gather timer: {}", e);
        }

        let mut send_timer = self
            .send_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if send_timer.is_armed()
            && let Err(e) = send_timer.stop()
        {
            error!("failed to stop send timer: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_INSTANCES;
    use crate::model::{InstanceIdent, NodeMonitorParams, PartitionInfo};
    use crate::monitor::timer::TimerError;
    use crate::monitor::traits::SendError;
    use std::sync::mpsc;

    /// Usage provider double mirroring the canonical fixture: CPU=1,
    /// RAM=1000, used size 100 for every watched partition.
    struct MockUsageProvider {
        params: NodeMonitorParams,
        fail_config: bool,
        /// Instance ids whose reads fail.
        failing_instances: Vec<String>,
    }

    impl MockUsageProvider {
        fn new(params: NodeMonitorParams) -> Self {
            Self {
                params,
                fail_config: false,
                failing_instances: Vec::new(),
            }
        }

        fn fill(data: &mut MonitoringData) {
            data.cpu = 1.0;
            data.ram = 1000;
            for disk in data.disk.iter_mut() {
                disk.used_size = 100;
            }
        }
    }

    impl UsageProvider for MockUsageProvider {
        fn node_info(&self) -> Result<NodeInfo, ProviderError> {
            let mut info = NodeInfo {
                num_cpus: 1,
                total_ram: 4000,
                ..Default::default()
            };
            let mut partition = PartitionInfo {
                name: "partitionName".to_string(),
                total_size: 1000,
                ..Default::default()
            };
            partition.types.push("partitionType".to_string()).unwrap();
            info.partitions.push(partition).unwrap();
            Ok(info)
        }

        fn node_monitoring_data(
            &self,
            _node_id: &str,
            data: &mut MonitoringData,
        ) -> Result<(), ProviderError> {
            Self::fill(data);
            Ok(())
        }

        fn instance_monitoring_data(
            &self,
            instance_id: &str,
            data: &mut MonitoringData,
        ) -> Result<(), ProviderError> {
            if self.failing_instances.iter().any(|id| id == instance_id) {
                return Err(ProviderError::new("instance unavailable"));
            }
            Self::fill(data);
            Ok(())
        }

        fn resource_config(&self) -> Result<NodeMonitorParams, ProviderError> {
            if self.fail_config {
                return Err(ProviderError::new("no resource config"));
            }
            Ok(self.params.clone())
        }
    }

    /// Sender double forwarding every snapshot to an mpsc channel.
    struct MockSender {
        tx: Mutex<mpsc::Sender<NodeMonitoringData>>,
    }

    impl MockSender {
        fn new() -> (Self, mpsc::Receiver<NodeMonitoringData>) {
            let (tx, rx) = mpsc::channel();
            (Self { tx: Mutex::new(tx) }, rx)
        }
    }

    impl MonitoringSender for MockSender {
        fn send_monitoring_data(&self, data: &NodeMonitoringData) -> Result<(), SendError> {
            self.tx
                .lock()
                .unwrap()
                .send(data.clone())
                .map_err(|e| SendError::Encode(e.to_string()))
        }
    }

    fn node_params() -> NodeMonitorParams {
        let mut params = NodeMonitorParams {
            node_id: "node1".to_string(),
            ..Default::default()
        };
        params
            .partitions
            .push(PartitionInfo {
                name: "partitionName".to_string(),
                path: "partitionPath".to_string(),
                ..Default::default()
            })
            .unwrap();
        params
    }

    fn instance_params(partition_name: &str) -> InstanceMonitorParams {
        let mut params = InstanceMonitorParams {
            ident: InstanceIdent {
                service_id: "serviceID".to_string(),
                subject_id: "subjectID".to_string(),
                instance: 1,
            },
            ..Default::default()
        };
        params
            .partitions
            .push(PartitionInfo {
                name: partition_name.to_string(),
                path: "partitionInstancePath".to_string(),
                ..Default::default()
            })
            .unwrap();
        params
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(10),
            send_interval: Duration::from_millis(20),
        }
    }

    fn idle_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(3600),
            send_interval: Duration::from_secs(3600),
        }
    }

    fn new_monitor(
        provider: MockUsageProvider,
        config: MonitorConfig,
    ) -> (ResourceMonitor, mpsc::Receiver<NodeMonitoringData>) {
        let (sender, rx) = MockSender::new();
        let monitor =
            ResourceMonitor::new(Arc::new(provider), Arc::new(sender), config).unwrap();
        (monitor, rx)
    }

    #[test]
    fn test_config_error_is_fatal() {
        let mut provider = MockUsageProvider::new(node_params());
        provider.fail_config = true;

        let (sender, _rx) = MockSender::new();
        let result =
            ResourceMonitor::new(Arc::new(provider), Arc::new(sender), MonitorConfig::default());

        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_node_info_passthrough() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        let info = monitor.node_info().unwrap();
        assert_eq!(info.num_cpus, 1);
        assert_eq!(info.total_ram, 4000);
        assert_eq!(info.partitions.len(), 1);
        assert_eq!(info.partitions[0].name, "partitionName");
        assert_eq!(info.partitions[0].types.len(), 1);
        assert_eq!(info.partitions[0].types[0], "partitionType");
        assert_eq!(info.partitions[0].total_size, 1000);
    }

    #[test]
    fn test_snapshot_seeded_from_resource_config() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.node_id, "node1");
        assert_eq!(snapshot.monitoring_data.disk.len(), 1);
        assert_eq!(snapshot.monitoring_data.disk[0].name, "partitionName");
        assert!(snapshot.instances.is_empty());
    }

    #[test]
    fn test_instance_registry_unique_and_bounded() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        for i in 0..MAX_INSTANCES {
            monitor
                .start_instance_monitoring(&format!("instance{}", i), instance_params("p"))
                .unwrap();
        }
        assert_eq!(monitor.snapshot().instances.len(), MAX_INSTANCES);

        // One past capacity fails and leaves the registry unchanged.
        let err = monitor.start_instance_monitoring("overflow", instance_params("p"));
        assert!(matches!(err, Err(MonitorError::Capacity(_))));
        assert_eq!(monitor.snapshot().instances.len(), MAX_INSTANCES);

        // Re-registration of a known id is an update, not a duplicate.
        monitor
            .start_instance_monitoring("instance0", instance_params("p2"))
            .unwrap();
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.instances.len(), MAX_INSTANCES);
        let updated = snapshot
            .instances
            .find(|i| i.instance_id == "instance0")
            .unwrap();
        assert_eq!(updated.monitoring_data.disk[0].name, "p2");
    }

    #[test]
    fn test_reregistration_preserves_identity_and_usage() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), fast_config());

        monitor
            .start_instance_monitoring("instance1", instance_params("partitionInstanceName"))
            .unwrap();

        // Let at least one gather pass populate the usage numbers.
        wait_until(|| {
            monitor
                .snapshot()
                .instances
                .find(|i| i.instance_id == "instance1")
                .is_some_and(|i| i.monitoring_data.cpu == 1.0)
        });

        let mut update = instance_params("replacedPartition");
        update.ident = InstanceIdent {
            service_id: "otherService".to_string(),
            subject_id: "otherSubject".to_string(),
            instance: 9,
        };
        monitor
            .start_instance_monitoring("instance1", update)
            .unwrap();

        let snapshot = monitor.snapshot();
        let instance = snapshot
            .instances
            .find(|i| i.instance_id == "instance1")
            .unwrap();

        // Identity survives re-registration; only the partition list changed.
        assert_eq!(instance.ident.service_id, "serviceID");
        assert_eq!(instance.ident.subject_id, "subjectID");
        assert_eq!(instance.ident.instance, 1);
        assert_eq!(instance.monitoring_data.disk[0].name, "replacedPartition");
        assert_eq!(instance.monitoring_data.cpu, 1.0);
        assert_eq!(instance.monitoring_data.ram, 1000);
    }

    #[test]
    fn test_stop_unknown_instance_not_found() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        let err = monitor.stop_instance_monitoring("ghost");
        assert!(matches!(err, Err(MonitorError::InstanceNotFound(_))));
        assert!(monitor.snapshot().instances.is_empty());
    }

    #[test]
    fn test_stop_instance_removes_entry() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        monitor
            .start_instance_monitoring("instance1", instance_params("p"))
            .unwrap();
        monitor.stop_instance_monitoring("instance1").unwrap();

        assert!(monitor.snapshot().instances.is_empty());
        assert!(matches!(
            monitor.stop_instance_monitoring("instance1"),
            Err(MonitorError::InstanceNotFound(_))
        ));
    }

    #[test]
    fn test_instance_id_length_bound() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        let long_id = "x".repeat(INSTANCE_ID_LEN + 1);
        assert!(matches!(
            monitor.start_instance_monitoring(&long_id, instance_params("p")),
            Err(MonitorError::IdTooLong { .. })
        ));
        assert!(monitor.snapshot().instances.is_empty());
    }

    #[test]
    fn test_gather_and_send_snapshot() {
        let (monitor, rx) = new_monitor(MockUsageProvider::new(node_params()), fast_config());

        monitor
            .start_instance_monitoring("instance1", instance_params("partitionInstanceName"))
            .unwrap();
        monitor.start_send_monitoring().unwrap();

        // Skip snapshots sent before the first gather pass covered the
        // instance.
        let snapshot = recv_until(&rx, |s| {
            s.instances
                .find(|i| i.instance_id == "instance1")
                .is_some_and(|i| i.monitoring_data.cpu == 1.0)
        });

        assert_eq!(snapshot.node_id, "node1");
        assert!(snapshot.timestamp > 0);
        assert_eq!(snapshot.monitoring_data.cpu, 1.0);
        assert_eq!(snapshot.monitoring_data.ram, 1000);
        assert_eq!(snapshot.monitoring_data.disk.len(), 1);
        assert_eq!(snapshot.monitoring_data.disk[0].name, "partitionName");
        assert_eq!(snapshot.monitoring_data.disk[0].path, "partitionPath");
        assert_eq!(snapshot.monitoring_data.disk[0].used_size, 100);

        assert_eq!(snapshot.instances.len(), 1);
        let instance = &snapshot.instances[0];
        assert_eq!(instance.instance_id, "instance1");
        assert_eq!(instance.ident.service_id, "serviceID");
        assert_eq!(instance.ident.subject_id, "subjectID");
        assert_eq!(instance.ident.instance, 1);
        assert_eq!(instance.monitoring_data.cpu, 1.0);
        assert_eq!(instance.monitoring_data.ram, 1000);
        assert_eq!(
            instance.monitoring_data.disk[0].name,
            "partitionInstanceName"
        );
        assert_eq!(instance.monitoring_data.disk[0].used_size, 100);
    }

    #[test]
    fn test_failed_instance_read_skipped() {
        let mut provider = MockUsageProvider::new(node_params());
        provider.failing_instances = vec!["bad".to_string()];
        let (monitor, _rx) = new_monitor(provider, fast_config());

        monitor
            .start_instance_monitoring("bad", instance_params("p"))
            .unwrap();
        monitor
            .start_instance_monitoring("good", instance_params("p"))
            .unwrap();

        wait_until(|| {
            monitor
                .snapshot()
                .instances
                .find(|i| i.instance_id == "good")
                .is_some_and(|i| i.monitoring_data.cpu == 1.0)
        });

        let snapshot = monitor.snapshot();
        let bad = snapshot.instances.find(|i| i.instance_id == "bad").unwrap();

        // The failing instance keeps its previous (initial) sample.
        assert_eq!(bad.monitoring_data.cpu, 0.0);
        assert_eq!(bad.monitoring_data.ram, 0);
    }

    #[test]
    fn test_no_send_without_start() {
        let (_monitor, rx) = new_monitor(MockUsageProvider::new(node_params()), fast_config());

        // Gathering runs, but nothing is sent until send monitoring starts.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_send_timer_arm_disarm_errors() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), idle_config());

        assert!(matches!(
            monitor.stop_send_monitoring(),
            Err(MonitorError::Timer(TimerError::NotArmed))
        ));

        monitor.start_send_monitoring().unwrap();
        assert!(matches!(
            monitor.start_send_monitoring(),
            Err(MonitorError::Timer(TimerError::AlreadyArmed))
        ));

        monitor.stop_send_monitoring().unwrap();
    }

    #[test]
    fn test_drop_terminates_both_loops() {
        let (monitor, _rx) = new_monitor(MockUsageProvider::new(node_params()), fast_config());
        monitor.start_send_monitoring().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            drop(monitor);
            done_tx.send(()).unwrap();
        });

        // Drop must join both loops without deadlocking on the shared lock.
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("monitor drop deadlocked");
    }

    /// Polls `pred` until it holds, panicking after a generous deadline.
    fn wait_until<F: Fn() -> bool>(pred: F) {
        for _ in 0..200 {
            if pred() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not reached within deadline");
    }

    /// Receives snapshots until one satisfies `pred`.
    fn recv_until<F>(rx: &mpsc::Receiver<NodeMonitoringData>, pred: F) -> NodeMonitoringData
    where
        F: Fn(&NodeMonitoringData) -> bool,
    {
        let deadline = Duration::from_secs(5);
        let start = std::time::Instant::now();
        loop {
            let remaining = deadline
                .checked_sub(start.elapsed())
                .expect("no matching snapshot within deadline");
            let snapshot = rx.recv_timeout(remaining).expect("sender channel closed");
            if pred(&snapshot) {
                return snapshot;
            }
        }
    }
}
