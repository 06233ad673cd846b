//! In-memory mock filesystem for testing the provider without a real host.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::provider::fs::{FileSystem, FsUsage};

/// In-memory filesystem.
///
/// Stores file contents and per-path filesystem usage figures, allowing tests
/// to simulate `/proc`, cgroup trees and mounted partitions on any platform.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    usage: HashMap<PathBuf, FsUsage>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Sets the usage figures reported for `path`.
    pub fn add_usage(&mut self, path: impl AsRef<Path>, total: u64, used: u64) {
        self.usage
            .insert(path.as_ref().to_path_buf(), FsUsage { total, used });
    }

    /// Adds the cgroup v2 files of one instance under `root`.
    ///
    /// # Arguments
    /// * `root` - cgroup hierarchy root (e.g. "/sys/fs/cgroup")
    /// * `instance_id` - instance cgroup directory name
    /// * `memory_current` - content of `memory.current`
    /// * `cpu_stat` - content of `cpu.stat`
    pub fn add_instance_cgroup(
        &mut self,
        root: impl AsRef<Path>,
        instance_id: &str,
        memory_current: &str,
        cpu_stat: &str,
    ) {
        let base = root.as_ref().join(instance_id);
        self.add_file(base.join("memory.current"), memory_current);
        self.add_file(base.join("cpu.stat"), cpu_stat);
    }

    /// A typical edge node: 4 CPUs, 16 GB-class RAM figures, one watched
    /// partition and one running instance.
    pub fn typical_node() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0
ctxt 500000
btime 1700000000
",
        );
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
",
        );

        fs.add_instance_cgroup(
            "/sys/fs/cgroup",
            "instance1",
            "52428800\n",
            "usage_usec 1500000\nuser_usec 1000000\nsystem_usec 500000\n",
        );

        fs.add_usage("/var/lib/edge", 10_000_000, 2_500_000);

        fs
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{:?}", path)))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.usage.contains_key(path)
            || self.files.keys().any(|p| p.starts_with(path))
    }

    fn usage(&self, path: &Path) -> io::Result<FsUsage> {
        self.usage
            .get(path)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{:?}", path)))
    }
}
