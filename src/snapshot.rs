use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fetched observation of live game stats. Immutable once constructed;
/// superseded each sampling cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub playing: u64,
    pub visits: u64,
    pub max_players: u64,
    pub created: String,
    pub updated: String,
    pub rating: f64,
    pub genre: String,
    pub fetched_at: DateTime<Utc>,
    pub fetch_latency_ms: u64,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.playing == 0
    }
}
