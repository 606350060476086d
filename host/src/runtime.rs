//! ==============================================================================
//! runtime.rs - dashboard runtime: timers, polling and advisory pipeline
//! ==============================================================================
//!
//! purpose:
//!     owns everything that changes over time:
//!     - the clock tick task (ui time, independent of sensor data)
//!     - the refresh task of the selected location (poll now, then every interval)
//!     - the advisory request spawned after each published snapshot
//!
//! relationships:
//!     - used by: main.rs (creates runtime, calls start/dispatch/view/shutdown)
//!     - uses: poller.rs, insight.rs, schedule.rs, state.rs
//!
//! location change:
//!
//!     dispatch(SelectLocation) ─► ui state updated
//!                               ─► begin_epoch()           (old results now stale)
//!                               ─► new RepeatingTask       (polls immediately)
//!                               ─► old RepeatingTask drop  (timer aborted)
//!
//! ==============================================================================

use crate::domain::{EnvironmentSnapshot, Location};
use crate::insight::InsightGenerator;
use crate::poller::Poller;
use crate::registry::LocationRegistry;
use crate::schedule::RepeatingTask;
use crate::state::{selected_location, DashboardState, DashboardView, UiEvent, UiState};

use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    pub poll_interval: Duration,
    pub clock_tick: Duration,
    /// log every published snapshot
    pub show_sensor_data: bool,
}

// ==============================================================================
// dashboard runtime - main public interface
// ==============================================================================

/// clone-able handle to shared dashboard state and its timers
#[derive(Clone)]
pub struct DashboardRuntime {
    registry: Arc<LocationRegistry>,
    poller: Poller,
    insight: InsightGenerator,
    settings: RuntimeSettings,
    state: Arc<RwLock<DashboardState>>,
    refresh_task: Arc<Mutex<Option<RepeatingTask>>>,
    clock_task: Arc<Mutex<Option<RepeatingTask>>>,
}

impl DashboardRuntime {
    pub fn new(
        registry: Arc<LocationRegistry>,
        poller: Poller,
        insight: InsightGenerator,
        settings: RuntimeSettings,
    ) -> Self {
        let ui = UiState::new(&registry, Local::now());
        Self {
            registry,
            poller,
            insight,
            settings,
            state: Arc::new(RwLock::new(DashboardState::new(ui))),
            refresh_task: Arc::new(Mutex::new(None)),
            clock_task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    /// start the clock and the refresh cycle of the default location
    pub async fn start(&self) {
        self.start_clock().await;
        self.restart_refresh().await;
    }

    /// apply a ui event; a location change restarts the refresh cycle
    pub async fn dispatch(&self, event: UiEvent) -> DashboardView {
        let location_changed = {
            let mut state = self.state.write().await;
            let before = state.ui.selected.clone();
            state.ui = state.ui.clone().apply(&event, &self.registry);
            state.ui.selected != before
        };

        if location_changed {
            self.restart_refresh().await;
        }

        self.view().await
    }

    pub async fn view(&self) -> DashboardView {
        self.state.read().await.view(&self.registry)
    }

    /// cancel both timers; in-flight results are discarded by the epoch check
    pub async fn shutdown(&self) {
        for slot in [&self.refresh_task, &self.clock_task] {
            if let Some(mut task) = slot.lock().await.take() {
                if task.is_active() {
                    task.cancel();
                }
            }
        }
        self.state.write().await.begin_epoch();
        tracing::info!("dashboard timers stopped");
    }

    async fn start_clock(&self) {
        let state = self.state.clone();
        let registry = self.registry.clone();

        let task = RepeatingTask::spawn("clock", self.settings.clock_tick, move || {
            let state = state.clone();
            let registry = registry.clone();
            async move {
                let mut state = state.write().await;
                state.ui = state.ui.clone().apply(&UiEvent::Tick(Local::now()), &registry);
            }
        });

        *self.clock_task.lock().await = Some(task);
    }

    async fn restart_refresh(&self) {
        // held for the whole restart so concurrent selections serialise
        let mut slot = self.refresh_task.lock().await;

        let (epoch, location) = {
            let mut state = self.state.write().await;
            let epoch = state.begin_epoch();
            (epoch, selected_location(&state.ui, &self.registry).clone())
        };

        tracing::info!(location = %location.id, name = %location.name, epoch, "refresh cycle started");

        let cycle = PollCycle {
            poller: self.poller.clone(),
            insight: self.insight.clone(),
            state: self.state.clone(),
            show_sensor_data: self.settings.show_sensor_data,
            location,
            epoch,
        };
        let task = RepeatingTask::spawn("refresh", self.settings.poll_interval, move || {
            let cycle = cycle.clone();
            async move { cycle.run().await }
        });

        // dropping the previous handle aborts its timer
        *slot = Some(task);
    }
}

// ==============================================================================
// poll cycle - what the refresh task runs each period
// ==============================================================================
// must not hold a DashboardRuntime: the runtime owns this task's handle.

#[derive(Clone)]
struct PollCycle {
    poller: Poller,
    insight: InsightGenerator,
    state: Arc<RwLock<DashboardState>>,
    show_sensor_data: bool,
    location: Location,
    epoch: u64,
}

impl PollCycle {
    /// one poll cycle; failures keep the previous snapshot on display
    async fn run(&self) {
        let location = &self.location;
        let snapshot = match self.poller.refresh(location).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(location = %location.id, "poll failed, keeping previous snapshot: {}", e);
                return;
            }
        };

        let token = {
            let mut state = self.state.write().await;
            let token = state.publish_snapshot(self.epoch, snapshot, now_ms());
            if token.is_none() {
                tracing::debug!(
                    location = %location.id,
                    epoch = self.epoch,
                    current = state.poll_epoch(),
                    "dropping snapshot of a previous selection"
                );
            }
            token
        };

        let Some(token) = token else { return };

        if self.show_sensor_data {
            log_snapshot(location, &snapshot);
        }

        // not awaited: the next poll must not wait on the language model
        let insight = self.insight.clone();
        let state = self.state.clone();
        let location = location.clone();
        tokio::spawn(async move {
            let text = insight.generate(&location, &snapshot).await;
            if !state.write().await.publish_insight(token, text) {
                tracing::debug!(location = %location.id, token, "discarding superseded advisory");
            }
        });
    }
}

fn log_snapshot(location: &Location, s: &EnvironmentSnapshot) {
    tracing::info!(
        location = %location.id,
        pm25 = s.pm25,
        temperature = s.temperature,
        humidity = s.humidity,
        co2 = s.co2,
        tvoc = s.tvoc,
        "snapshot published"
    );
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
