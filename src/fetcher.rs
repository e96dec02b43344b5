use crate::error::{Error, FetchStage, Result};
use crate::snapshot::Snapshot;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct UniverseResponse {
    #[serde(rename = "universeId")]
    universe_id: u64,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    data: Vec<GamePayload>,
}

#[derive(Debug, Deserialize)]
struct GamePayload {
    name: String,
    playing: u64,
    visits: u64,
    #[serde(rename = "maxPlayers")]
    max_players: u64,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
}

/// Client for the two chained catalog calls: place → universe resolution,
/// then universe → live stats. The universe id is resolved once and cached
/// for the process lifetime. No retry here; retry policy belongs to the
/// sampling loop.
pub struct GameClient {
    client: Client,
    place_id: String,
    apis_base: String,
    games_base: String,
    universe_id: OnceLock<u64>,
}

impl GameClient {
    pub fn new(place_id: String, apis_base: String, games_base: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("player-tracker/0.1")
            .build()
            .expect("Building HTTP client");

        Self {
            client,
            place_id,
            apis_base: apis_base.trim_end_matches('/').to_string(),
            games_base: games_base.trim_end_matches('/').to_string(),
            universe_id: OnceLock::new(),
        }
    }

    pub async fn resolve_universe(&self) -> Result<u64> {
        if let Some(id) = self.universe_id.get() {
            return Ok(*id);
        }

        let url = format!(
            "{}/universes/v1/places/{}/universe",
            self.apis_base, self.place_id
        );
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::fetch(FetchStage::Resolve, e))?;
        if !res.status().is_success() {
            return Err(Error::fetch(
                FetchStage::Resolve,
                format!("HTTP {}", res.status()),
            ));
        }
        let body: UniverseResponse = res
            .json()
            .await
            .map_err(|e| Error::fetch(FetchStage::Resolve, e))?;

        let _ = self.universe_id.set(body.universe_id);
        log::info!("resolved place {} to universe {}", self.place_id, body.universe_id);
        Ok(body.universe_id)
    }

    /// Fetch one live-stats snapshot. Resolves the universe id first if it
    /// has not been cached yet.
    pub async fn fetch(&self) -> Result<Snapshot> {
        let universe_id = self.resolve_universe().await?;

        let url = format!("{}/v1/games?universeIds={}", self.games_base, universe_id);
        let start = Instant::now();
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::fetch(FetchStage::Stats, e))?;
        if !res.status().is_success() {
            return Err(Error::fetch(
                FetchStage::Stats,
                format!("HTTP {}", res.status()),
            ));
        }
        let body: GamesResponse = res
            .json()
            .await
            .map_err(|e| Error::fetch(FetchStage::Stats, e))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let game = body.data.into_iter().next().ok_or_else(|| {
            Error::fetch(
                FetchStage::Stats,
                format!("no game data for universe {universe_id}"),
            )
        })?;

        Ok(Snapshot {
            name: game.name,
            playing: game.playing,
            visits: game.visits,
            max_players: game.max_players,
            created: game.created,
            updated: game.updated,
            rating: game.rating.unwrap_or(0.0),
            genre: game.genre.unwrap_or_else(|| "All".to_string()),
            fetched_at: Utc::now(),
            fetch_latency_ms: latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn game_body(playing: u64) -> serde_json::Value {
        serde_json::json!({
            "data": [{
                "name": "Obby Kingdom",
                "playing": playing,
                "visits": 123456,
                "maxPlayers": 50,
                "created": "2021-03-01T00:00:00Z",
                "updated": "2024-06-01T00:00:00Z",
                "genre": "Adventure"
            }]
        })
    }

    #[tokio::test]
    async fn resolves_then_fetches_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universes/v1/places/987/universe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "universeId": 42
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/games"))
            .and(query_param("universeIds", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(game_body(7)))
            .mount(&server)
            .await;

        let client = GameClient::new("987".into(), server.uri(), server.uri());
        let snap = client.fetch().await.unwrap();
        assert_eq!(snap.playing, 7);
        assert_eq!(snap.name, "Obby Kingdom");
        assert_eq!(snap.max_players, 50);
        assert_eq!(snap.genre, "Adventure");

        // second fetch reuses the cached universe id (expect(1) on the mock)
        let snap = client.fetch().await.unwrap();
        assert_eq!(snap.visits, 123456);
    }

    #[tokio::test]
    async fn resolve_failure_is_tagged_with_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GameClient::new("987".into(), server.uri(), server.uri());
        match client.fetch().await {
            Err(Error::Fetch { stage, .. }) => assert_eq!(stage, FetchStage::Resolve),
            other => panic!("expected resolve error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stats_failure_is_tagged_with_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universes/v1/places/987/universe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "universeId": 42
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/games"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = GameClient::new("987".into(), server.uri(), server.uri());
        match client.fetch().await {
            Err(Error::Fetch { stage, .. }) => assert_eq!(stage, FetchStage::Stats),
            other => panic!("expected stats error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_payload_is_a_stats_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universes/v1/places/987/universe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "universeId": 42
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/games"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let client = GameClient::new("987".into(), server.uri(), server.uri());
        assert!(matches!(
            client.fetch().await,
            Err(Error::Fetch {
                stage: FetchStage::Stats,
                ..
            })
        ));
    }
}
