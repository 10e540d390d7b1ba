//! Periodic refresh of `csv` and `img` groups.

use std::collections::HashMap;
use std::time::Duration;

/// Starts recurring timers. Every tick of a timer must result in a
/// [`refresh_tick`](super::LayerLifecycleManager::refresh_tick) call for the group.
pub trait TimerService {
    /// Starts a timer for the group. The timer runs until the returned handle is dropped.
    fn start(&self, group_id: &str, interval: Duration) -> TimerHandle;
}

/// Running timer. Dropping the handle stops the timer.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    /// Creates a handle calling `cancel` when dropped.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle of a timer that needs no cleanup.
    pub fn detached() -> Self {
        Self { cancel: None }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Timer service that never ticks. Used when periodic refresh is not wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTimers;

impl TimerService for NoTimers {
    fn start(&self, group_id: &str, _interval: Duration) -> TimerHandle {
        log::debug!("Periodic refresh of {group_id} is disabled");
        TimerHandle::detached()
    }
}

/// Refresh timers of all groups, at most one per group.
pub struct RefreshTimers {
    service: Box<dyn TimerService>,
    running: HashMap<String, TimerHandle>,
}

impl RefreshTimers {
    /// Creates an empty registry starting timers with the given service.
    pub fn new(service: Box<dyn TimerService>) -> Self {
        Self {
            service,
            running: HashMap::new(),
        }
    }

    /// Starts the timer of the group unless it is already running. Returns true if a timer was
    /// started.
    pub fn ensure_running(&mut self, group_id: &str, interval_seconds: f64) -> bool {
        if self.running.contains_key(group_id) {
            return false;
        }

        if interval_seconds <= 0.0 {
            log::warn!("Invalid refresh interval {interval_seconds} of {group_id}");
            return false;
        }

        let interval = match Duration::try_from_secs_f64(interval_seconds) {
            Ok(interval) => interval,
            Err(err) => {
                log::warn!("Invalid refresh interval {interval_seconds} of {group_id}: {err}");
                return false;
            }
        };
        log::debug!("Starting refresh of {group_id} every {interval:?}");
        let handle = self.service.start(group_id, interval);
        self.running.insert(group_id.to_string(), handle);

        true
    }

    /// Stops the timer of the group. Returns true if a timer was running.
    pub fn stop(&mut self, group_id: &str) -> bool {
        let stopped = self.running.remove(group_id).is_some();
        if stopped {
            log::debug!("Stopped refresh of {group_id}");
        }

        stopped
    }

    /// Returns true if the group has a running timer.
    pub fn is_running(&self, group_id: &str) -> bool {
        self.running.contains_key(group_id)
    }

    /// Stops all timers.
    pub fn stop_all(&mut self) {
        self.running.clear();
    }
}

impl std::fmt::Debug for RefreshTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTimers")
            .field("running", &self.running.keys().collect::<Vec<_>>())
            .finish()
    }
}
