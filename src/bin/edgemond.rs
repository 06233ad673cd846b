//! edgemond - edge-node resource telemetry daemon.
//!
//! Samples node and workload-instance resource usage and periodically
//! forwards the assembled snapshot to a remote collector.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use edgemon::config::MonitorConfig;
use edgemon::model::{NodeMonitorParams, PartitionInfo};
use edgemon::monitor::ResourceMonitor;
#[cfg(not(target_os = "linux"))]
use edgemon::provider::MockFs;
#[cfg(target_os = "linux")]
use edgemon::provider::RealFs;
use edgemon::provider::SystemUsageProvider;
use edgemon::sender::CollectorClient;

/// Edge-node resource telemetry daemon.
#[derive(Parser)]
#[command(name = "edgemond", about = "Edge-node resource telemetry daemon", version)]
struct Args {
    /// Node id reported in every snapshot.
    #[arg(short, long, default_value = "edge-node")]
    node_id: String,

    /// Partition to watch, as "name:path[:type,type...]". Repeatable.
    #[arg(short, long = "partition", value_parser = parse_partition)]
    partitions: Vec<PartitionInfo>,

    /// Collector address snapshots are forwarded to.
    #[arg(short, long, default_value = "127.0.0.1:9931")]
    collector: String,

    /// Usage gathering interval in seconds.
    #[arg(short, long, default_value = "5")]
    interval: u64,

    /// Snapshot send interval in seconds.
    #[arg(short, long, default_value = "10")]
    send_interval: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to the cgroup v2 hierarchy instance cgroups live under.
    #[arg(long, default_value = "/sys/fs/cgroup")]
    cgroup_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses a partition spec "name:path[:type,type...]".
fn parse_partition(s: &str) -> Result<PartitionInfo, String> {
    let mut parts = s.splitn(3, ':');

    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| format!("invalid partition '{}': missing name", s))?;
    let path = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| format!("invalid partition '{}': missing path", s))?;

    let mut partition = PartitionInfo {
        name: name.to_string(),
        path: path.to_string(),
        ..Default::default()
    };

    if let Some(types) = parts.next() {
        for tag in types.split(',').filter(|t| !t.is_empty()) {
            partition
                .types
                .push(tag.to_string())
                .map_err(|e| format!("invalid partition '{}': {}", s, e))?;
        }
    }

    Ok(partition)
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("edgemond={}", level).parse().unwrap())
        .add_directive(format!("edgemon={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("edgemond {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: node={}, collector={}, poll={}s, send={}s",
        args.node_id, args.collector, args.interval, args.send_interval
    );

    let mut params = NodeMonitorParams {
        node_id: args.node_id,
        ..Default::default()
    };
    for partition in &args.partitions {
        if let Err(e) = params.partitions.push(partition.clone()) {
            error!("too many partitions: {}", e);
            std::process::exit(1);
        }
    }
    if params.partitions.is_empty() {
        warn!("no partitions configured, disk usage will not be reported");
    }

    #[cfg(target_os = "linux")]
    let provider = SystemUsageProvider::new(RealFs::new(), &args.proc_path, &args.cgroup_path, params);
    #[cfg(not(target_os = "linux"))]
    let provider = SystemUsageProvider::new(MockFs::new(), &args.proc_path, &args.cgroup_path, params);

    let sender = CollectorClient::new(args.collector);

    let config = MonitorConfig {
        poll_interval: Duration::from_secs(args.interval),
        send_interval: Duration::from_secs(args.send_interval),
    };

    let monitor = match ResourceMonitor::new(Arc::new(provider), Arc::new(sender), config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Failed to init resource monitor: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = monitor.start_send_monitoring() {
        error!("Failed to start send monitoring: {}", e);
        std::process::exit(1);
    }

    info!("Monitoring started");

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("Shutting down...");
    drop(monitor);
    info!("Shutdown complete");
}
