use crate::snapshot::Snapshot;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

pub type SharedState = Arc<RwLock<AppState>>;

/// Read-only status surface. No mutation routes, no auth.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/", get(dashboard))
        .route("/dashboard", get(dashboard))
        .route("/api/stats", get(api_stats))
        .route("/api/history", get(api_history))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve(state: SharedState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("status server listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatsBody {
    current: Option<Snapshot>,
    daily: crate::state::DailyCounters,
    streak: crate::state::StreakState,
    runtime: crate::state::RuntimeCounters,
    avg_fetch_latency_ms: u64,
    consecutive_failures: u32,
    history_len: usize,
    history_capacity: usize,
    started_at: DateTime<Utc>,
    uptime_secs: i64,
}

async fn ping() -> &'static str {
    "OK"
}

async fn api_stats(State(state): State<SharedState>) -> Json<StatsBody> {
    let st = state.read().await;
    Json(StatsBody {
        current: st.current.clone(),
        daily: st.daily.clone(),
        streak: st.streak.clone(),
        runtime: st.runtime.clone(),
        avg_fetch_latency_ms: st.latency.average_ms(),
        consecutive_failures: st.errors.consecutive_failures,
        history_len: st.history.len(),
        history_capacity: st.history.capacity(),
        started_at: st.started_at,
        uptime_secs: (Utc::now() - st.started_at).num_seconds(),
    })
}

async fn api_history(State(state): State<SharedState>) -> Json<Vec<Snapshot>> {
    let st = state.read().await;
    Json(st.history.iter().cloned().collect())
}

async fn dashboard(State(state): State<SharedState>) -> Html<String> {
    let st = state.read().await;
    let name = st
        .current
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or("(waiting for first sample)");
    Html(DASHBOARD_TEMPLATE.replace("{{name}}", name))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Single-file dashboard that polls /api/stats client-side.
const DASHBOARD_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Player Tracker</title>
<style>
  body { font-family: sans-serif; background: #1e1f22; color: #e8e8e8; margin: 2rem; }
  h1 { font-size: 1.4rem; }
  table { border-collapse: collapse; margin-top: 1rem; }
  td { padding: 0.3rem 0.8rem; border-bottom: 1px solid #333; }
  td:first-child { color: #999; }
</style>
</head>
<body>
<h1>Tracking: {{name}}</h1>
<table id="stats"><tr><td>loading…</td></tr></table>
<script>
async function refresh() {
  const res = await fetch('/api/stats');
  const s = await res.json();
  const rows = [
    ['Players', s.current ? s.current.playing + '/' + s.current.max_players : '-'],
    ['Visits', s.current ? s.current.visits.toLocaleString() : '-'],
    ['Daily peak / low', s.daily.peak + ' / ' + s.daily.low],
    ['Joins / leaves today', s.daily.total_joins + ' / ' + s.daily.total_leaves],
    ['Active streak', s.streak.active_streak + ' (best ' + s.streak.longest_active + ')'],
    ['Empty streak', s.streak.empty_streak + ' (best ' + s.streak.longest_empty + ')'],
    ['Samples ok / failed', s.runtime.samples_ok + ' / ' + s.runtime.samples_failed],
    ['Avg fetch latency', s.avg_fetch_latency_ms + ' ms'],
    ['History', s.history_len + ' / ' + s.history_capacity],
    ['Uptime', Math.floor(s.uptime_secs / 60) + ' min'],
  ];
  document.getElementById('stats').innerHTML =
    rows.map(r => '<tr><td>' + r[0] + '</td><td>' + r[1] + '</td></tr>').join('');
}
refresh();
setInterval(refresh, 15000);
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use std::time::Duration;

    fn shared_state() -> SharedState {
        let mut state = AppState::new(100, 5, Duration::from_secs(300));
        let snap = Snapshot {
            name: "Obby Kingdom".into(),
            playing: 12,
            visits: 9000,
            max_players: 50,
            created: String::new(),
            updated: String::new(),
            rating: 0.0,
            genre: "All".into(),
            fetched_at: Utc::now(),
            fetch_latency_ms: 42,
        };
        state.history.push(snap.clone());
        state.streak.update(snap.playing);
        state.latency.record(snap.fetch_latency_ms);
        state.current = Some(snap);
        Arc::new(RwLock::new(state))
    }

    async fn spawn_server() -> String {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(shared_state());
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn ping_returns_ok() {
        let base = spawn_server().await;
        let res = reqwest::get(format!("{base}/ping")).await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn stats_exposes_snapshot_and_counters() {
        let base = spawn_server().await;
        let body: serde_json::Value = reqwest::get(format!("{base}/api/stats"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["current"]["playing"], 12);
        assert_eq!(body["streak"]["active_streak"], 1);
        assert_eq!(body["avg_fetch_latency_ms"], 42);
        assert_eq!(body["history_len"], 1);
    }

    #[tokio::test]
    async fn history_returns_array() {
        let base = spawn_server().await;
        let body: serde_json::Value = reqwest::get(format!("{base}/api/history"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Obby Kingdom");
    }

    #[tokio::test]
    async fn dashboard_and_404() {
        let base = spawn_server().await;
        let res = reqwest::get(format!("{base}/dashboard")).await.unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.text().await.unwrap().contains("Obby Kingdom"));

        let res = reqwest::get(format!("{base}/definitely-not-here"))
            .await
            .unwrap();
        assert_eq!(res.status(), 404);
    }
}
