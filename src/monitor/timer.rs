//! Repeating timer running its callback on a dedicated thread.
//!
//! The monitor's timers must never block the loops they wake, so each timer
//! owns a thread that sleeps on a condition variable and fires the callback
//! once per interval. `stop()` interrupts the sleep promptly instead of
//! waiting out the current tick.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Error type for timer arm/disarm requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// `start` on a timer that is already running.
    AlreadyArmed,
    /// `stop` on a timer that is not running.
    NotArmed,
    /// The timer thread panicked and could not be joined.
    WorkerPanicked,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::AlreadyArmed => write!(f, "timer already armed"),
            TimerError::NotArmed => write!(f, "timer not armed"),
            TimerError::WorkerPanicked => write!(f, "timer worker panicked"),
        }
    }
}

impl std::error::Error for TimerError {}

/// Stop signal shared with the timer thread.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

/// A repeating timer. One timer drives at most one callback at a time; the
/// callback runs on the timer's own thread.
pub struct RepeatingTimer {
    worker: Option<(Arc<StopSignal>, JoinHandle<()>)>,
}

impl RepeatingTimer {
    pub fn new() -> Self {
        Self { worker: None }
    }

    /// Whether the timer is currently running.
    pub fn is_armed(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts firing `callback` every `interval`.
    ///
    /// # Arguments
    /// * `interval` - Time between ticks
    /// * `run_immediately` - Fire once before the first interval elapses
    /// * `callback` - Invoked on the timer thread at each tick
    pub fn start<F>(
        &mut self,
        interval: Duration,
        run_immediately: bool,
        callback: F,
    ) -> Result<(), TimerError>
    where
        F: Fn() + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(TimerError::AlreadyArmed);
        }

        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            if run_immediately {
                callback();
            }

            loop {
                let stopped = thread_signal
                    .stopped
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let (stopped, _timeout) = thread_signal
                    .cond
                    .wait_timeout_while(stopped, interval, |stopped| !*stopped)
                    .unwrap_or_else(PoisonError::into_inner);

                if *stopped {
                    break;
                }
                drop(stopped);

                callback();
            }
        });

        self.worker = Some((signal, handle));
        Ok(())
    }

    /// Stops the timer and joins its thread.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        let (signal, handle) = self.worker.take().ok_or(TimerError::NotArmed)?;

        *signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
        signal.cond.notify_all();

        handle.join().map_err(|_| TimerError::WorkerPanicked)
    }
}

impl Default for RepeatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        if self.is_armed() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_timer_fires_repeatedly() {
        let count = Arc::new(AtomicUsize::new(0));
        let fired = Arc::clone(&count);

        let mut timer = RepeatingTimer::new();
        timer
            .start(Duration::from_millis(10), false, move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        thread::sleep(Duration::from_millis(100));
        timer.stop().unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_run_immediately_fires_before_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let fired = Arc::clone(&count);

        let mut timer = RepeatingTimer::new();
        timer
            .start(Duration::from_secs(60), true, move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        timer.stop().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_start_rejected() {
        let mut timer = RepeatingTimer::new();
        timer.start(Duration::from_secs(60), false, || {}).unwrap();

        assert_eq!(
            timer.start(Duration::from_secs(60), false, || {}),
            Err(TimerError::AlreadyArmed)
        );

        timer.stop().unwrap();
    }

    #[test]
    fn test_stop_unarmed_rejected() {
        let mut timer = RepeatingTimer::new();
        assert_eq!(timer.stop(), Err(TimerError::NotArmed));
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let mut timer = RepeatingTimer::new();
        timer.start(Duration::from_secs(3600), false, || {}).unwrap();

        // Must return promptly, not after an hour.
        timer.stop().unwrap();
        assert!(!timer.is_armed());
    }
}
