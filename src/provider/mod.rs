//! System usage provider backed by `/proc` and cgroup v2.
//!
//! All host access goes through the [`FileSystem`] trait so the provider can
//! be exercised with an in-memory mock on any platform:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            SystemUsageProvider                │
//! │   node: /proc/stat, /proc/meminfo, statvfs    │
//! │   instance: <cgroup>/<id>/memory.current,     │
//! │             <cgroup>/<id>/cpu.stat, statvfs   │
//! └──────────────────────┬────────────────────────┘
//!                        │
//!                 ┌──────▼──────┐
//!                 │ FileSystem  │ (trait)
//!                 └──────┬──────┘
//!            ┌───────────┴───────────┐
//!     ┌──────▼──────┐         ┌──────▼──────┐
//!     │   RealFs    │         │   MockFs    │
//!     │  (host)     │         │  (testing)  │
//!     └─────────────┘         └─────────────┘
//! ```

pub mod cgroup;
mod fs;
pub mod mock;
pub mod procfs;
mod system;

pub use fs::{FileSystem, FsUsage, RealFs};
pub use mock::MockFs;
pub use system::SystemUsageProvider;
