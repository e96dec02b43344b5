use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Per-day aggregates, reset at each daily-summary emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCounters {
    pub peak: u64,
    pub low: u64,
    pub total_joins: u64,
    pub total_leaves: u64,
    pub rapid_growth_events: u64,
    pub mass_exodus_events: u64,
    pub period_start: DateTime<Utc>,
}

impl DailyCounters {
    pub fn seeded(playing: u64) -> Self {
        Self {
            peak: playing,
            low: playing,
            total_joins: 0,
            total_leaves: 0,
            rapid_growth_events: 0,
            mass_exodus_events: 0,
            period_start: Utc::now(),
        }
    }

    pub fn observe(&mut self, previous: u64, current: u64) {
        self.peak = self.peak.max(current);
        self.low = self.low.min(current);
        if current > previous {
            self.total_joins += current - previous;
        } else {
            self.total_leaves += previous - current;
        }
    }
}

impl Default for DailyCounters {
    fn default() -> Self {
        Self::seeded(0)
    }
}

/// Consecutive fetch-failure tracking. When the count reaches the threshold a
/// critical alert fires once and a cool-down is armed that unconditionally
/// zeroes the counter after `cooldown` — the loop itself never stops fetching.
/// A persistent outage will therefore alert again every `threshold` failures
/// once the cool-down lapses; that matches the source behavior on purpose.
#[derive(Debug)]
pub struct ErrorState {
    pub consecutive_failures: u32,
    threshold: u32,
    cooldown: Duration,
    reset_at: Option<Instant>,
}

impl ErrorState {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            threshold,
            cooldown,
            reset_at: None,
        }
    }

    /// Expire the cool-down if its deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.reset_at {
            if now >= deadline {
                self.consecutive_failures = 0;
                self.reset_at = None;
                log::info!("error cool-down elapsed, failure counter reset");
            }
        }
    }

    /// Returns true exactly when this failure crosses the threshold.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures == self.threshold {
            self.reset_at = Some(now + self.cooldown);
            return true;
        }
        false
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.reset_at = None;
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

/// Rolling buffer of the last N stats-call latencies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyBuffer {
    samples: VecDeque<u64>,
}

const LATENCY_WINDOW: usize = 100;

impl LatencyBuffer {
    pub fn record(&mut self, latency_ms: u64) {
        if self.samples.len() == LATENCY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
    }

    pub fn average_ms(&self) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        self.samples.iter().sum::<u64>() / self.samples.len() as u64
    }
}

/// Process-lifetime operational totals, surfaced on /api/stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeCounters {
    pub samples_ok: u64,
    pub samples_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}
