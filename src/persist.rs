use crate::error::{Error, Result};
use crate::state::PersistedState;
use std::fs;
use std::path::Path;

/// Whole-file JSON checkpoint. Written via a sibling temp file and rename so
/// a crash mid-write never leaves a truncated state file behind.
pub fn save(path: &Path, state: &PersistedState) -> Result<()> {
    let body = serde_json::to_vec(state)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &body)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
    log::debug!("state checkpoint written to {}", path.display());
    Ok(())
}

/// Load the checkpoint if one exists. A missing file is a cold start, not an
/// error; a corrupt file is reported so the caller can log and continue.
pub fn load(path: &Path) -> Result<Option<PersistedState>> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Persistence(format!("{}: {}", path.display(), e)));
        }
    };
    let state = serde_json::from_str(&body)
        .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use crate::state::AppState;
    use chrono::Utc;
    use std::time::Duration;

    fn snap(playing: u64) -> Snapshot {
        Snapshot {
            name: "Test Game".into(),
            playing,
            visits: 100,
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
    fn round_trip_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = AppState::new(100, 5, Duration::from_secs(300));
        for i in 0..5 {
            let s = snap(i);
            state.streak.update(s.playing);
            state.daily.observe(i.saturating_sub(1), i);
            state.history.push(s.clone());
            state.current = Some(s);
        }
        state.runtime.samples_ok = 5;

        save(&path, &state.to_persisted()).unwrap();

        let mut fresh = AppState::new(100, 5, Duration::from_secs(300));
        fresh.restore(load(&path).unwrap().unwrap());

        assert_eq!(fresh.history.len(), 5);
        assert_eq!(fresh.streak.active_streak, state.streak.active_streak);
        assert_eq!(fresh.streak.longest_empty, state.streak.longest_empty);
        assert_eq!(fresh.daily.peak, state.daily.peak);
        assert_eq!(fresh.runtime.samples_ok, 5);
        assert_eq!(fresh.current.unwrap().playing, 4);
    }

    #[test]
    fn missing_file_is_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(Error::Persistence(_))));
    }
}
