//! Single-flight repeating timer.
//!
//! A [`RepeatingTimer`] owns one dedicated thread that invokes its callback at
//! a fixed interval. Because every firing happens on that one thread, two
//! executions of the callback can never overlap, and [`RepeatingTimer::stop`]
//! with `wait = true` joins the thread so no execution survives shutdown.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use viewsync_core::timer::{RepeatingTimer, TimerConfig};
//!
//! let timer = RepeatingTimer::new(
//!     TimerConfig::new(Duration::from_millis(200)).name("queue-view"),
//!     || println!("tick"),
//! )?;
//!
//! timer.start()?;
//! // ...
//! timer.stop(true);
//! # Ok::<(), viewsync_core::CoreError>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;

use crate::error::{Result, TimerError};
use crate::logging::targets;

/// Default interval between two firings.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Configuration for creating a [`RepeatingTimer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Name for the timer thread.
    pub name: String,
    /// Interval between two firings.
    pub interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            name: "viewsync-timer".to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl TimerConfig {
    /// Create a configuration with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set the thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// A boxed timer callback.
type TimerCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Control messages for the timer thread.
enum TimerCommand {
    Stop,
}

/// A running timer thread.
struct TimerThread {
    handle: JoinHandle<()>,
    stop_sender: Sender<TimerCommand>,
    thread_id: ThreadId,
}

/// A cancellable repeating job with single-flight execution.
pub struct RepeatingTimer {
    config: TimerConfig,
    callback: TimerCallback,
    /// Whether the timer has been started and not stopped since.
    running: Arc<AtomicBool>,
    /// The current (or last, when stopped without waiting) timer thread.
    thread: Mutex<Option<TimerThread>>,
    /// Number of completed callback executions.
    fired: Arc<AtomicU64>,
}

impl RepeatingTimer {
    /// Create a stopped timer. Call [`start`](Self::start) to begin firing.
    pub fn new<F>(config: TimerConfig, callback: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if config.interval.is_zero() {
            return Err(TimerError::ZeroInterval.into());
        }

        Ok(Self {
            config,
            callback: Arc::new(callback),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
            fired: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start firing. The first execution happens one interval from now.
    ///
    /// Returns `Ok(false)` if the timer was already running. A thread left
    /// behind by a non-waiting [`stop`](Self::stop) is joined first, so the
    /// callback never runs on two threads at once.
    pub fn start(&self) -> Result<bool> {
        let mut slot = self.thread.lock();
        if self.running.load(Ordering::Acquire) {
            return Ok(false);
        }

        if let Some(previous) = slot.take() {
            self.join_thread(previous);
        }

        let (stop_sender, stop_receiver) = bounded(1);
        let interval = self.config.interval;
        let callback = self.callback.clone();
        let running = self.running.clone();
        let fired = self.fired.clone();

        self.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || {
                let mut next_fire = Instant::now() + interval;
                loop {
                    match stop_receiver.recv_deadline(next_fire) {
                        Ok(TimerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            if !running.load(Ordering::Acquire) {
                                break;
                            }

                            callback();
                            fired.fetch_add(1, Ordering::AcqRel);

                            // Base the next deadline on the scheduled time to avoid
                            // drift, skipping firings missed by a slow callback.
                            next_fire += interval;
                            let now = Instant::now();
                            while next_fire <= now {
                                next_fire += interval;
                            }
                        }
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.running.store(false, Ordering::Release);
                return Err(TimerError::SpawnFailed(err).into());
            }
        };

        tracing::debug!(
            target: targets::TIMER,
            name = %self.config.name,
            interval_ms = interval.as_millis() as u64,
            "timer started"
        );

        *slot = Some(TimerThread {
            thread_id: handle.thread().id(),
            handle,
            stop_sender,
        });
        Ok(true)
    }

    /// Stop firing.
    ///
    /// With `wait = true` this blocks until an in-flight execution has
    /// finished and the timer thread has exited. When called from the timer's
    /// own thread the join is skipped; the thread exits once the current
    /// execution returns.
    ///
    /// Returns `true` if the timer was running.
    pub fn stop(&self, wait: bool) -> bool {
        let mut slot = self.thread.lock();
        let was_running = self.running.swap(false, Ordering::AcqRel);

        if let Some(current) = slot.as_ref() {
            let _ = current.stop_sender.try_send(TimerCommand::Stop);
        }

        if wait && let Some(current) = slot.take() {
            if current.thread_id == thread::current().id() {
                // Stopping from inside the callback; the loop exits on return.
                drop(current);
            } else {
                self.join_thread(current);
            }
        }

        if was_running {
            tracing::debug!(target: targets::TIMER, name = %self.config.name, wait, "timer stopped");
        }
        was_running
    }

    fn join_thread(&self, timer_thread: TimerThread) {
        if timer_thread.handle.join().is_err() {
            tracing::warn!(
                target: targets::TIMER,
                name = %self.config.name,
                "timer callback panicked"
            );
        }
    }

    /// Check if the timer is currently started.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get the firing interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Get the number of completed callback executions since creation.
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.stop(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_zero_interval_rejected() {
        let result = RepeatingTimer::new(TimerConfig::new(Duration::ZERO), || {});
        assert!(result.is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = TimerConfig::default()
            .name("view-timer")
            .interval(Duration::from_millis(50));

        assert_eq!(config.name, "view-timer");
        assert_eq!(config.interval, Duration::from_millis(50));
        assert_eq!(TimerConfig::default().interval, DEFAULT_INTERVAL);
    }

    #[test]
    fn test_start_and_stop() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let timer = RepeatingTimer::new(TimerConfig::new(Duration::from_millis(10)), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(!timer.is_running());
        assert!(timer.start().unwrap());
        assert!(!timer.start().unwrap());
        assert!(timer.is_running());

        thread::sleep(Duration::from_millis(100));
        assert!(timer.stop(true));
        assert!(!timer.is_running());

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 1, "expected at least one firing, got {after_stop}");

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_stop_twice_is_noop() {
        let timer = RepeatingTimer::new(TimerConfig::new(Duration::from_millis(10)), || {}).unwrap();
        timer.start().unwrap();
        assert!(timer.stop(true));
        assert!(!timer.stop(true));
        assert!(!timer.stop(false));
    }

    #[test]
    fn test_restart_after_non_waiting_stop() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let timer = RepeatingTimer::new(TimerConfig::new(Duration::from_millis(10)), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        timer.start().unwrap();
        timer.stop(false);
        assert!(timer.start().unwrap());

        thread::sleep(Duration::from_millis(60));
        timer.stop(true);
        assert!(count.load(Ordering::SeqCst) >= 1);
    }
}
