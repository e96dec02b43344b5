use crate::engine::Intent;
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::state::{DailyCounters, StreakState};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const USERNAME: &str = "Player Tracker";

/// Delivery is best-effort by design: the caller may ignore this result.
pub type DeliveryResult = Result<()>;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage {
    pub username: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, message: &WebhookMessage) -> Result<()>;
}

/// POSTs messages to a chat webhook. One attempt, no retry.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("player-tracker/0.1")
            .build()
            .expect("Building HTTP client");
        Self { client, url }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, message: &WebhookMessage) -> Result<()> {
        let res = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| Error::Delivery(e.to_string()))?;
        if !res.status().is_success() {
            return Err(Error::Delivery(format!("HTTP {}", res.status())));
        }
        Ok(())
    }
}

/// Renders notification intents into webhook messages and posts them.
/// Failures are logged and surfaced as an ignorable result; they never
/// affect the sampling loop.
pub struct Notifier {
    sink: Box<dyn NotificationSink>,
    place_id: String,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotificationSink>, place_id: String) -> Self {
        Self { sink, place_id }
    }

    pub async fn send(&self, message: WebhookMessage) -> DeliveryResult {
        match self.sink.deliver(&message).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("webhook delivery failed: {}", e);
                Err(e)
            }
        }
    }

    pub async fn send_intent(&self, intent: &Intent, snapshot: &Snapshot) -> DeliveryResult {
        self.send(intent_message(intent, snapshot, &self.place_id))
            .await
    }

    pub async fn send_status(
        &self,
        snapshot: &Snapshot,
        daily: &DailyCounters,
        streak: &StreakState,
        avg_latency_ms: u64,
    ) -> DeliveryResult {
        self.send(status_message(
            snapshot,
            daily,
            streak,
            avg_latency_ms,
            &self.place_id,
        ))
        .await
    }

    pub async fn send_daily_summary(
        &self,
        snapshot: &Snapshot,
        daily: &DailyCounters,
    ) -> DeliveryResult {
        self.send(daily_message(snapshot, daily)).await
    }

    pub async fn send_critical(&self, failures: u32, last_error: &str) -> DeliveryResult {
        self.send(critical_message(failures, last_error)).await
    }

    pub async fn send_startup(&self, snapshot: &Snapshot) -> DeliveryResult {
        self.send(startup_message(snapshot, &self.place_id)).await
    }

    pub async fn send_startup_failure(&self, error: &str) -> DeliveryResult {
        self.send(startup_failure_message(&self.place_id, error))
            .await
    }

    pub async fn send_shutdown(&self, snapshot: Option<&Snapshot>) -> DeliveryResult {
        self.send(shutdown_message(snapshot)).await
    }
}

fn embed(title: &str, description: String, color: u32, fields: Vec<EmbedField>) -> WebhookMessage {
    WebhookMessage {
        username: USERNAME.to_string(),
        embeds: vec![Embed {
            title: title.to_string(),
            description,
            color,
            fields,
            timestamp: Utc::now().to_rfc3339(),
            footer: EmbedFooter {
                text: USERNAME.to_string(),
            },
        }],
    }
}

fn field(name: &str, value: String, inline: bool) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value,
        inline,
    }
}

fn players_field(s: &Snapshot) -> EmbedField {
    field("👥 Players", format!("{}/{}", s.playing, s.max_players), true)
}

fn visits_field(s: &Snapshot) -> EmbedField {
    field("👀 Total Visits", group_digits(s.visits), true)
}

fn play_now_field(place_id: &str) -> EmbedField {
    field(
        "🔗 Play Now",
        format!("[Click to Play](https://www.roblox.com/games/{place_id})"),
        true,
    )
}

pub fn intent_message(intent: &Intent, s: &Snapshot, place_id: &str) -> WebhookMessage {
    match intent {
        Intent::RapidGrowth { delta } => embed(
            "📈 Rapid Growth!",
            format!(
                "**{}** gained **{}** players in one check — now **{}** online.",
                s.name, delta, s.playing
            ),
            0x00e676,
            vec![players_field(s), visits_field(s), play_now_field(place_id)],
        ),
        Intent::Join { .. } => embed(
            "🎮 Player Joined!",
            format!("**{}** now has **{}** players online.", s.name, s.playing),
            0x00ff00,
            vec![players_field(s), visits_field(s), play_now_field(place_id)],
        ),
        Intent::MassExodus { delta } => embed(
            "📉 Mass Exodus",
            format!(
                "**{}** lost **{}** players in one check — now **{}** online.",
                s.name, delta, s.playing
            ),
            0xe74c3c,
            vec![players_field(s), visits_field(s)],
        ),
        Intent::Leave { .. } => embed(
            "👋 Player Left",
            format!("**{}** now has **{}** players online.", s.name, s.playing),
            0xff6b6b,
            vec![players_field(s), visits_field(s)],
        ),
        Intent::PlayerMilestone(m) => embed(
            "🏆 Player Milestone!",
            format!(
                "**{}** reached **{}** concurrent players!",
                s.name,
                group_digits(*m)
            ),
            0xffd700,
            vec![players_field(s), play_now_field(place_id)],
        ),
        Intent::VisitMilestone(m) => embed(
            "🎉 Visit Milestone!",
            format!("**{}** passed **{}** total visits!", s.name, group_digits(*m)),
            0xffd700,
            vec![visits_field(s), play_now_field(place_id)],
        ),
        Intent::VipAlert => embed(
            "⭐ VIP Activity",
            format!(
                "**{}** crossed the VIP floor with **{}** players online.",
                s.name, s.playing
            ),
            0x9b59b6,
            vec![players_field(s)],
        ),
        Intent::Anomaly { deviation } => embed(
            "🚨 Unusual Player Activity",
            format!(
                "**{}** is at **{}** players, {:+.1}σ from the recent average.",
                s.name, s.playing, deviation
            ),
            0xff9800,
            vec![players_field(s)],
        ),
        Intent::PerformanceAlert { latency_ms } => embed(
            "🐌 Slow API Response",
            format!("Stats fetch for **{}** took **{}ms**.", s.name, latency_ms),
            0xffcc00,
            vec![field("Latency", format!("{latency_ms}ms"), true)],
        ),
    }
}

pub fn status_message(
    s: &Snapshot,
    daily: &DailyCounters,
    streak: &StreakState,
    avg_latency_ms: u64,
    place_id: &str,
) -> WebhookMessage {
    let mut message = embed(
        "📊 Game Status Update",
        format!("Current status for **{}**", s.name),
        0x5865f2,
        vec![
            field(
                "👥 Current Players",
                format!("{}/{}", s.playing, s.max_players),
                true,
            ),
            visits_field(s),
            field(
                "📈 Today's Peak / Low",
                format!("{} / {}", daily.peak, daily.low),
                true,
            ),
            field(
                "🔥 Streak",
                if s.playing > 0 {
                    format!("{} active checks", streak.active_streak)
                } else {
                    format!("{} empty checks", streak.empty_streak)
                },
                true,
            ),
            field("⏱️ Avg Fetch Latency", format!("{avg_latency_ms}ms"), true),
            play_now_field(place_id),
        ],
    );
    message.embeds[0].footer.text = "Hourly Status Update".to_string();
    message
}

pub fn daily_message(s: &Snapshot, daily: &DailyCounters) -> WebhookMessage {
    let mut message = embed(
        "📅 Daily Summary",
        format!("Last 24 hours for **{}**", s.name),
        0x3498db,
        vec![
            field("📈 Peak Players", daily.peak.to_string(), true),
            field("📉 Lowest Players", daily.low.to_string(), true),
            field("➕ Total Joins", group_digits(daily.total_joins), true),
            field("➖ Total Leaves", group_digits(daily.total_leaves), true),
            field(
                "🚀 Rapid Growth Events",
                daily.rapid_growth_events.to_string(),
                true,
            ),
            field(
                "🌊 Mass Exodus Events",
                daily.mass_exodus_events.to_string(),
                true,
            ),
        ],
    );
    message.embeds[0].footer.text = "Daily Summary".to_string();
    message
}

pub fn critical_message(failures: u32, last_error: &str) -> WebhookMessage {
    embed(
        "⚠️ Tracker Error",
        "The player tracker hit repeated fetch failures.".to_string(),
        0xff0000,
        vec![
            field("Error", format!("`{last_error}`"), false),
            field("Consecutive Errors", failures.to_string(), true),
        ],
    )
}

pub fn startup_message(s: &Snapshot, place_id: &str) -> WebhookMessage {
    embed(
        "✅ Tracker Online",
        format!("Now tracking **{}**.", s.name),
        0x57f287,
        vec![players_field(s), visits_field(s), play_now_field(place_id)],
    )
}

pub fn startup_failure_message(place_id: &str, error: &str) -> WebhookMessage {
    embed(
        "💥 Tracker Failed to Start",
        format!("Could not fetch initial stats for place **{place_id}**."),
        0xff0000,
        vec![field("Error", format!("`{error}`"), false)],
    )
}

pub fn shutdown_message(s: Option<&Snapshot>) -> WebhookMessage {
    let description = match s {
        Some(s) => format!(
            "Tracker for **{}** is shutting down. Last count: **{}** players.",
            s.name, s.playing
        ),
        None => "Tracker is shutting down.".to_string(),
    };
    embed("👋 Tracker Shutting Down", description, 0x99aab5, vec![])
}

/// 1234567 -> "1,234,567", the webhook counterpart of toLocaleString.
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn snap(playing: u64) -> Snapshot {
        Snapshot {
            name: "Obby Kingdom".into(),
            playing,
            visits: 1_234_567,
            max_players: 50,
            created: String::new(),
            updated: String::new(),
            rating: 0.0,
            genre: "All".into(),
            fetched_at: Utc::now(),
            fetch_latency_ms: 10,
        }
    }

    #[test]
    fn digit_grouping() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(1_234_567), "1,234,567");
    }

    #[test]
    fn join_embed_shape() {
        let message = intent_message(&Intent::Join { delta: 2 }, &snap(14), "987");
        assert_eq!(message.username, USERNAME);
        let embed = &message.embeds[0];
        assert_eq!(embed.title, "🎮 Player Joined!");
        assert_eq!(embed.color, 0x00ff00);
        assert_eq!(embed.fields[0].value, "14/50");
        assert_eq!(embed.fields[1].value, "1,234,567");
        assert!(embed.fields[2].value.contains("roblox.com/games/987"));
    }

    #[test]
    fn milestone_embed_groups_digits() {
        let message = intent_message(&Intent::VisitMilestone(1_000_000), &snap(5), "987");
        assert!(message.embeds[0].description.contains("1,000,000"));
    }

    #[tokio::test]
    async fn delivers_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({ "username": USERNAME })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(
            Box::new(WebhookSink::new(format!("{}/hook", server.uri()))),
            "987".into(),
        );
        let result = notifier
            .send_intent(&Intent::Join { delta: 1 }, &snap(3))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::new(
            Box::new(WebhookSink::new(format!("{}/hook", server.uri()))),
            "987".into(),
        );
        let result = notifier
            .send_intent(&Intent::Leave { delta: 1 }, &snap(3))
            .await;
        assert!(matches!(result, Err(Error::Delivery(_))));
    }
}
