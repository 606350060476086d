//! ==============================================================================
//! state.rs - display state and its transitions
//! ==============================================================================
//!
//! purpose:
//!     UiState is the display-only state (selected station, dropdown, overlay,
//!     wall clock). it changes only through UiState::apply, a pure function of
//!     (state, event).
//!
//!     DashboardState wraps it with the data the poller and the insight
//!     generator publish. two counters guard against stale writes:
//!     - poll epoch: bumped on every location selection. a snapshot fetched
//!       under an older epoch is dropped.
//!     - insight token: issued with every published snapshot. only the most
//!       recently issued token may write the advisory text.
//!
//! relationships:
//!     - used by: runtime.rs (shared behind Arc<RwLock<_>>), render.rs, main.rs
//!
//! ==============================================================================

use crate::domain::{EnvironmentSnapshot, Location, Metric};
use crate::insight::INSIGHT_PLACEHOLDER;
use crate::registry::LocationRegistry;
use chrono::{DateTime, Local};
use serde::Serialize;

/// detail overlay descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Modal {
    pub title: String,
    pub metric: Metric,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UiState {
    pub selected: String,
    pub dropdown_open: bool,
    pub modal: Option<Modal>,
    pub now: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    ToggleDropdown,
    SelectLocation(String),
    OpenModal(Metric),
    CloseModal,
    Tick(DateTime<Local>),
}

impl UiState {
    pub fn new(registry: &LocationRegistry, now: DateTime<Local>) -> Self {
        Self {
            selected: registry.default_location().id.clone(),
            dropdown_open: false,
            modal: None,
            now,
        }
    }

    pub fn apply(self, event: &UiEvent, registry: &LocationRegistry) -> Self {
        match event {
            UiEvent::ToggleDropdown => Self { dropdown_open: !self.dropdown_open, ..self },
            UiEvent::SelectLocation(id) => match registry.get(id) {
                Some(loc) => Self { selected: loc.id.clone(), dropdown_open: false, ..self },
                None => self,
            },
            UiEvent::OpenModal(metric) => Self {
                modal: Some(Modal { title: metric.title().to_string(), metric: *metric }),
                ..self
            },
            UiEvent::CloseModal => Self { modal: None, ..self },
            UiEvent::Tick(now) => Self { now: *now, ..self },
        }
    }
}

// ==============================================================================
// dashboard state
// ==============================================================================

pub struct DashboardState {
    pub ui: UiState,
    pub snapshot: Option<EnvironmentSnapshot>,
    pub insight: String,
    /// unix timestamp (ms) of last published snapshot
    pub last_update_ms: u64,
    poll_epoch: u64,
    insight_token: u64,
}

/// what GET /api returns
#[derive(Clone, Debug, Serialize)]
pub struct DashboardView {
    pub location: Location,
    pub ui: UiState,
    pub snapshot: Option<EnvironmentSnapshot>,
    pub insight: String,
    pub last_update_ms: u64,
}

impl DashboardState {
    pub fn new(ui: UiState) -> Self {
        Self {
            ui,
            snapshot: None,
            insight: INSIGHT_PLACEHOLDER.to_string(),
            last_update_ms: 0,
            poll_epoch: 0,
            insight_token: 0,
        }
    }

    pub fn poll_epoch(&self) -> u64 {
        self.poll_epoch
    }

    /// start a new refresh schedule; results of older epochs are ignored from now on
    ///
    /// also voids any advisory still in flight for the previous location.
    pub fn begin_epoch(&mut self) -> u64 {
        self.poll_epoch += 1;
        self.insight_token += 1;
        self.poll_epoch
    }

    /// store a snapshot if `epoch` is current; returns the insight token to generate under
    pub fn publish_snapshot(
        &mut self,
        epoch: u64,
        snapshot: EnvironmentSnapshot,
        now_ms: u64,
    ) -> Option<u64> {
        if epoch != self.poll_epoch {
            return None;
        }
        self.snapshot = Some(snapshot);
        self.last_update_ms = now_ms;
        self.insight_token += 1;
        Some(self.insight_token)
    }

    /// store advisory text if `token` is the latest issued; false when superseded
    pub fn publish_insight(&mut self, token: u64, text: String) -> bool {
        if token != self.insight_token {
            return false;
        }
        self.insight = text;
        true
    }

    pub fn view(&self, registry: &LocationRegistry) -> DashboardView {
        DashboardView {
            location: selected_location(&self.ui, registry).clone(),
            ui: self.ui.clone(),
            snapshot: self.snapshot,
            insight: self.insight.clone(),
            last_update_ms: self.last_update_ms,
        }
    }
}

/// the selected location, or the default if the id is somehow unknown
pub fn selected_location<'a>(ui: &UiState, registry: &'a LocationRegistry) -> &'a Location {
    registry.get(&ui.selected).unwrap_or_else(|| registry.default_location())
}
