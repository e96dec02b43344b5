use crate::config::Thresholds;
use crate::snapshot::Snapshot;
use crate::state::History;

/// Samples the anomaly check averages over.
const ANOMALY_WINDOW: usize = 20;

/// What the engine decided should be announced for one sampling cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    RapidGrowth { delta: u64 },
    Join { delta: u64 },
    MassExodus { delta: u64 },
    Leave { delta: u64 },
    PlayerMilestone(u64),
    VisitMilestone(u64),
    VipAlert,
    Anomaly { deviation: f64 },
    PerformanceAlert { latency_ms: u64 },
}

/// Pure decision function: inspects the delta between two snapshots plus
/// recent history and returns the notification intents for this cycle, in
/// priority order. Category toggles are applied by the caller; thresholds
/// live here.
pub fn evaluate(
    previous: &Snapshot,
    current: &Snapshot,
    history: &History,
    thresholds: &Thresholds,
    player_milestones: &[u64],
    visit_milestones: &[u64],
) -> Vec<Intent> {
    let mut intents = Vec::new();

    if current.playing > previous.playing {
        let delta = current.playing - previous.playing;
        if delta >= thresholds.rapid_growth {
            intents.push(Intent::RapidGrowth { delta });
        } else if current.playing >= thresholds.min_players_for_notification {
            intents.push(Intent::Join { delta });
        }
    } else if current.playing < previous.playing {
        let delta = previous.playing - current.playing;
        if delta >= thresholds.mass_exodus {
            intents.push(Intent::MassExodus { delta });
        } else {
            intents.push(Intent::Leave { delta });
        }
    }

    if let Some(m) = first_crossing(previous.playing, current.playing, player_milestones) {
        intents.push(Intent::PlayerMilestone(m));
    }
    if let Some(m) = first_crossing(previous.visits, current.visits, visit_milestones) {
        intents.push(Intent::VisitMilestone(m));
    }

    if previous.playing < thresholds.vip && current.playing >= thresholds.vip {
        intents.push(Intent::VipAlert);
    }

    if let Some(deviation) = anomaly_deviation(current.playing, history, thresholds.anomaly_sigma) {
        intents.push(Intent::Anomaly { deviation });
    }

    if current.fetch_latency_ms > thresholds.lag_alert_ms {
        intents.push(Intent::PerformanceAlert {
            latency_ms: current.fetch_latency_ms,
        });
    }

    intents
}

/// First milestone with previous < m <= current, ascending order.
fn first_crossing(previous: u64, current: u64, milestones: &[u64]) -> Option<u64> {
    milestones
        .iter()
        .copied()
        .find(|&m| previous < m && m <= current)
}

/// Deviation of the latest count from the trailing-window mean, in standard
/// deviations (population, not Bessel-corrected). None until the window is
/// full, and None when the window has zero variance.
fn anomaly_deviation(current: u64, history: &History, sigma: f64) -> Option<f64> {
    let counts = history.recent_counts(ANOMALY_WINDOW);
    if counts.len() < ANOMALY_WINDOW {
        return None;
    }

    let n = counts.len() as f64;
    let mean = counts.iter().sum::<u64>() as f64 / n;
    let variance = counts
        .iter()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }

    let deviation = (current as f64 - mean) / std_dev;
    if deviation.abs() > sigma {
        Some(deviation)
    } else {
        None
    }
}
