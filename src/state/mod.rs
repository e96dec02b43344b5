pub mod counters;
pub mod history;
pub mod streak;

pub use counters::{DailyCounters, ErrorState, LatencyBuffer, RuntimeCounters};
pub use history::History;
pub use streak::StreakState;

use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All mutable tracker state, owned by the sampling loop and shared read-only
/// with the status server. No ambient singletons; everything the loop and the
/// decision engine touch lives here.
#[derive(Debug)]
pub struct AppState {
    pub history: History,
    pub streak: StreakState,
    pub daily: DailyCounters,
    pub errors: ErrorState,
    pub latency: LatencyBuffer,
    pub runtime: RuntimeCounters,
    pub current: Option<Snapshot>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(history_capacity: usize, error_threshold: u32, error_cooldown: Duration) -> Self {
        Self {
            history: History::new(history_capacity),
            streak: StreakState::default(),
            daily: DailyCounters::default(),
            errors: ErrorState::new(error_threshold, error_cooldown),
            latency: LatencyBuffer::default(),
            runtime: RuntimeCounters::default(),
            current: None,
            started_at: Utc::now(),
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            history: self.history.clone(),
            streak: self.streak.clone(),
            daily: self.daily.clone(),
            latency: self.latency.clone(),
            runtime: self.runtime.clone(),
            current: self.current.clone(),
        }
    }

    /// Rehydrate from a previously saved blob. Fetch-health state is not
    /// restored; a restart always begins with a clean failure counter.
    pub fn restore(&mut self, saved: PersistedState) {
        self.history = saved.history;
        self.streak = saved.streak;
        self.daily = saved.daily;
        self.latency = saved.latency;
        self.runtime = saved.runtime;
        self.current = saved.current;
    }
}

/// The on-disk checkpoint: overwritten wholesale on each save, read once at
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub history: History,
    pub streak: StreakState,
    pub daily: DailyCounters,
    pub latency: LatencyBuffer,
    pub runtime: RuntimeCounters,
    pub current: Option<Snapshot>,
}
