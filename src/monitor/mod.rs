//! Resource monitor: periodic gathering and forwarding of usage data.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ResourceMonitor                        │
//! │                                                              │
//! │  gather timer ──┐                        ┌── send timer      │
//! │  (own thread)   │ set flag + notify_all  │   (own thread)    │
//! │                 ▼                        ▼                   │
//! │        ┌─────────────────────────────────────────┐           │
//! │        │  Mutex<MonitorState> + shared Condvar   │           │
//! │        │  snapshot · gather_due · send_due ·     │           │
//! │        │  shutdown                               │           │
//! │        └────────┬───────────────────┬────────────┘           │
//! │                 │                   │                        │
//! │          Gatherer loop         Sender loop                   │
//! │                 │                   │                        │
//! └─────────────────┼───────────────────┼────────────────────────┘
//!                   ▼                   ▼
//!            UsageProvider       MonitoringSender
//!            (trait)             (trait)
//! ```
//!
//! Both loops wait on the same condition variable and distinguish wakeups by
//! predicate only: each consumes its own due-flag, and a single shutdown
//! broadcast drains both. Timer callbacks run on the timers' own threads and
//! do nothing but set a flag under the lock and notify.

mod error;
#[allow(clippy::module_inception)]
mod monitor;
mod timer;
mod traits;

pub use error::MonitorError;
pub use monitor::ResourceMonitor;
pub use timer::{RepeatingTimer, TimerError};
pub use traits::{MonitoringSender, ProviderError, SendError, UsageProvider};
