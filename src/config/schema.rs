use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackerConfig {
    /// Place identifier of the game to track.
    #[validate(length(min = 1))]
    pub place_id: String,

    /// Chat webhook the notifier posts to.
    #[validate(url)]
    pub webhook_url: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_check_interval")]
    #[validate(range(min = 1))]
    pub check_interval_secs: u64,

    #[serde(default = "default_status_interval")]
    #[validate(range(min = 60))]
    pub status_interval_secs: u64,

    /// How much history to retain, in hours. Together with the sample
    /// interval this fixes the ring-buffer capacity.
    #[serde(default = "default_retention_hours")]
    #[validate(range(min = 1))]
    pub retention_hours: u64,

    #[serde(default = "default_state_path")]
    pub state_path: String,

    #[serde(default = "default_persist_interval")]
    pub persist_interval_secs: u64,

    #[serde(default)]
    pub notifications: NotificationToggles,

    #[serde(default)]
    #[validate]
    pub thresholds: Thresholds,

    #[serde(default = "default_player_milestones")]
    #[validate(custom = "validate_ascending")]
    pub player_milestones: Vec<u64>,

    #[serde(default = "default_visit_milestones")]
    #[validate(custom = "validate_ascending")]
    pub visit_milestones: Vec<u64>,

    /// Base URL of the universe-resolution API.
    #[serde(default = "default_apis_base_url")]
    pub apis_base_url: String,

    /// Base URL of the live-stats API.
    #[serde(default = "default_games_base_url")]
    pub games_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationToggles {
    pub joins: bool,
    pub leaves: bool,
    pub milestones: bool,
    pub anomalies: bool,
    pub rapid_growth: bool,
    pub vip: bool,
    pub performance: bool,
}

impl Default for NotificationToggles {
    fn default() -> Self {
        Self {
            joins: true,
            leaves: true,
            milestones: true,
            anomalies: true,
            rapid_growth: true,
            vip: true,
            performance: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum player count before join notifications fire at all.
    pub min_players_for_notification: u64,

    /// One-tick gain that upgrades a join to rapid growth.
    #[validate(range(min = 1))]
    pub rapid_growth: u64,

    /// One-tick drop that upgrades a leave to a mass exodus.
    #[validate(range(min = 1))]
    pub mass_exodus: u64,

    /// Standard deviations from the rolling mean before a sample counts as
    /// anomalous.
    pub anomaly_sigma: f64,

    /// Player count whose upward crossing triggers a VIP alert.
    pub vip: u64,

    /// Stats-call latency above which a performance alert fires.
    pub lag_alert_ms: u64,

    pub max_consecutive_errors: u32,

    pub error_cooldown_secs: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_players_for_notification: 1,
            rapid_growth: 5,
            mass_exodus: 10,
            anomaly_sigma: 2.5,
            vip: 50,
            lag_alert_ms: 2000,
            max_consecutive_errors: 5,
            error_cooldown_secs: 300,
        }
    }
}

impl TrackerConfig {
    /// Ring-buffer capacity implied by the retention window.
    pub fn history_capacity(&self) -> usize {
        ((self.retention_hours * 3600) / self.check_interval_secs.max(1)).max(1) as usize
    }
}

fn validate_ascending(values: &[u64]) -> Result<(), ValidationError> {
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ValidationError::new("milestones_not_ascending"));
    }
    Ok(())
}

fn default_port() -> u16 {
    3000
}

fn default_check_interval() -> u64 {
    15
}

fn default_status_interval() -> u64 {
    3600
}

fn default_retention_hours() -> u64 {
    24
}

fn default_state_path() -> String {
    "tracker_state.json".to_string()
}

fn default_persist_interval() -> u64 {
    300
}

fn default_player_milestones() -> Vec<u64> {
    vec![10, 25, 50, 100, 250, 500, 1000]
}

fn default_visit_milestones() -> Vec<u64> {
    vec![
        1_000, 10_000, 100_000, 500_000, 1_000_000, 5_000_000, 10_000_000,
    ]
}

fn default_apis_base_url() -> String {
    "https://apis.roblox.com".to_string()
}

fn default_games_base_url() -> String {
    "https://games.roblox.com".to_string()
}
