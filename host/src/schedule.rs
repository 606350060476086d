//! ==============================================================================
//! schedule.rs - cancellable repeating tasks
//! ==============================================================================
//!
//! purpose:
//!     the host runs two timers: the clock tick and the data refresh. each is a
//!     RepeatingTask. the handle owns the spawned tokio task and aborts it on
//!     cancel() or drop, so replacing a handle in place (location change) or
//!     dropping it (shutdown) never leaves a timer running.
//!
//! timing:
//!     the job runs once immediately, then once per period. a slow job delays
//!     the next run instead of stacking runs (MissedTickBehavior::Delay).
//!
//! ==============================================================================

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct RepeatingTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// run `job` now and then every `period` until cancelled
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // first tick completes immediately
                interval.tick().await;
                job().await;
            }
        });

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "scheduled");
        Self { name, handle: Some(handle) }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(task = self.name, "cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
