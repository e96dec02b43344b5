use crate::config::{NotificationToggles, TrackerConfig};
use crate::engine::{self, Intent};
use crate::error::Result;
use crate::fetcher::GameClient;
use crate::notifier::Notifier;
use crate::persist;
use crate::server::SharedState;
use crate::snapshot::Snapshot;
use crate::state::DailyCounters;
use chrono::{Local, NaiveDate, Timelike};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::time::{MissedTickBehavior, interval};

/// Drives the fetch → compare → notify cycle. All timers interleave on the
/// one task that calls `run`, so ticks never overlap and the shared state is
/// only ever mutated from this execution path.
pub struct TrackerEngine {
    config: TrackerConfig,
    client: GameClient,
    notifier: Notifier,
    state: SharedState,
    state_path: PathBuf,
    last_daily_summary: Option<NaiveDate>,
}

impl TrackerEngine {
    pub fn new(
        config: TrackerConfig,
        client: GameClient,
        notifier: Notifier,
        state: SharedState,
    ) -> Self {
        let state_path = PathBuf::from(&config.state_path);
        Self {
            config,
            client,
            notifier,
            state,
            state_path,
            last_daily_summary: None,
        }
    }

    /// First resolve + fetch. A failure here is fatal to the process; the
    /// caller sends a best-effort failure notification and exits non-zero.
    pub async fn startup(&self) -> Result<Snapshot> {
        let snapshot = self.client.fetch().await?;

        let mut st = self.state.write().await;
        st.latency.record(snapshot.fetch_latency_ms);
        if st.current.is_none() {
            // cold start: baseline the daily window on what we see now
            st.daily = DailyCounters::seeded(snapshot.playing);
        }
        st.history.push(snapshot.clone());
        st.streak.update(snapshot.playing);
        st.runtime.samples_ok += 1;
        st.current = Some(snapshot.clone());

        log::info!(
            "tracking \"{}\": {}/{} players, {} visits",
            snapshot.name,
            snapshot.playing,
            snapshot.max_players,
            snapshot.visits
        );
        Ok(snapshot)
    }

    pub async fn announce_startup(&self, snapshot: &Snapshot) {
        let _ = self.notifier.send_startup(snapshot).await;
    }

    pub async fn announce_startup_failure(&self, error: &crate::error::Error) {
        let _ = self.notifier.send_startup_failure(&error.to_string()).await;
    }

    pub async fn run(&mut self) {
        let mut sample = interval(Duration::from_secs(self.config.check_interval_secs));
        let mut status = interval(Duration::from_secs(self.config.status_interval_secs));
        let mut checkpoint = interval(Duration::from_secs(self.config.persist_interval_secs));
        for timer in [&mut sample, &mut status, &mut checkpoint] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // consume the immediate first tick; startup already sampled
        }
        sample.tick().await;
        status.tick().await;
        checkpoint.tick().await;

        loop {
            tokio::select! {
                _ = sample.tick() => self.sample_tick().await,
                _ = status.tick() => self.status_tick().await,
                _ = checkpoint.tick() => self.persist_tick().await,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("shutting down...");
                    self.shutdown().await;
                    break;
                }
            }
        }
    }

    async fn sample_tick(&mut self) {
        {
            let mut st = self.state.write().await;
            st.errors.tick(Instant::now());
        }

        match self.client.fetch().await {
            Ok(snapshot) => self.on_snapshot(snapshot).await,
            Err(e) => self.on_failure(e).await,
        }
    }

    async fn on_snapshot(&mut self, snapshot: Snapshot) {
        let intents = {
            let mut st = self.state.write().await;
            st.errors.record_success();
            st.runtime.samples_ok += 1;
            st.latency.record(snapshot.fetch_latency_ms);

            let previous = st.current.clone();
            st.history.push(snapshot.clone());
            st.streak.update(snapshot.playing);

            let mut intents = Vec::new();
            if let Some(previous) = previous {
                st.daily.observe(previous.playing, snapshot.playing);
                intents = engine::evaluate(
                    &previous,
                    &snapshot,
                    &st.history,
                    &self.config.thresholds,
                    &self.config.player_milestones,
                    &self.config.visit_milestones,
                );
                intents.retain(|i| enabled(i, &self.config.notifications));
                for intent in &intents {
                    match intent {
                        Intent::RapidGrowth { .. } => st.daily.rapid_growth_events += 1,
                        Intent::MassExodus { .. } => st.daily.mass_exodus_events += 1,
                        _ => {}
                    }
                }
            }
            st.current = Some(snapshot.clone());
            intents
        };

        let mut sent = 0u64;
        let mut failed = 0u64;
        for intent in &intents {
            log::info!("notification: {:?}", intent);
            match self.notifier.send_intent(intent, &snapshot).await {
                Ok(()) => sent += 1,
                Err(_) => failed += 1,
            }
        }
        if sent + failed > 0 {
            let mut st = self.state.write().await;
            st.runtime.notifications_sent += sent;
            st.runtime.notifications_failed += failed;
        }
    }

    async fn on_failure(&mut self, error: crate::error::Error) {
        let (failures, threshold, crossed) = {
            let mut st = self.state.write().await;
            st.runtime.samples_failed += 1;
            let crossed = st.errors.record_failure(Instant::now());
            (st.errors.consecutive_failures, st.errors.threshold(), crossed)
        };
        log::error!("fetch failed ({failures}/{threshold}): {error}");

        if crossed {
            log::error!("too many consecutive fetch failures, sending critical alert");
            let _ = self.notifier.send_critical(failures, &error.to_string()).await;
        }
    }

    async fn status_tick(&mut self) {
        let (snapshot, daily, streak, avg_latency) = {
            let st = self.state.read().await;
            match &st.current {
                Some(s) => (
                    s.clone(),
                    st.daily.clone(),
                    st.streak.clone(),
                    st.latency.average_ms(),
                ),
                None => return,
            }
        };

        let _ = self
            .notifier
            .send_status(&snapshot, &daily, &streak, avg_latency)
            .await;
        log::info!("sent hourly status update");

        self.maybe_daily_summary(&snapshot, &daily).await;
    }

    /// Daily summary fires in the first ten minutes past local midnight, at
    /// most once per calendar day, and resets the daily window afterwards.
    async fn maybe_daily_summary(&mut self, snapshot: &Snapshot, daily: &DailyCounters) {
        let now = Local::now();
        if now.hour() != 0 || now.minute() >= 10 {
            return;
        }
        let today = now.date_naive();
        if self.last_daily_summary == Some(today) {
            return;
        }
        self.last_daily_summary = Some(today);

        let _ = self.notifier.send_daily_summary(snapshot, daily).await;
        log::info!("sent daily summary, resetting daily counters");

        let mut st = self.state.write().await;
        let baseline = st.current.as_ref().map(|s| s.playing).unwrap_or(0);
        st.daily = DailyCounters::seeded(baseline);
    }

    async fn persist_tick(&self) {
        let persisted = self.state.read().await.to_persisted();
        if let Err(e) = persist::save(&self.state_path, &persisted) {
            log::warn!("state checkpoint failed: {}", e);
        }
    }

    async fn shutdown(&self) {
        self.persist_tick().await;
        let snapshot = self.state.read().await.current.clone();
        let _ = self.notifier.send_shutdown(snapshot.as_ref()).await;
    }
}

fn enabled(intent: &Intent, toggles: &NotificationToggles) -> bool {
    match intent {
        Intent::RapidGrowth { .. } => toggles.rapid_growth,
        Intent::Join { .. } => toggles.joins,
        Intent::MassExodus { .. } | Intent::Leave { .. } => toggles.leaves,
        Intent::PlayerMilestone(_) | Intent::VisitMilestone(_) => toggles.milestones,
        Intent::VipAlert => toggles.vip,
        Intent::Anomaly { .. } => toggles.anomalies,
        Intent::PerformanceAlert { .. } => toggles.performance,
    }
}
