use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded FIFO of snapshots, oldest first. Capacity is the retention
/// window divided by the sample interval (24h at 15s = 5760 entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    capacity: usize,
    entries: VecDeque<Snapshot>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    /// Player counts of the most recent `n` samples, oldest first.
    pub fn recent_counts(&self, n: usize) -> Vec<u64> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(|s| s.playing).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snap(playing: u64) -> Snapshot {
        Snapshot {
            name: "Test Game".into(),
            playing,
            visits: 0,
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
    fn never_exceeds_capacity_and_evicts_oldest() {
        let mut history = History::new(3);
        for i in 0..10 {
            history.push(snap(i));
            assert!(history.len() <= 3);
        }
        let counts: Vec<u64> = history.iter().map(|s| s.playing).collect();
        assert_eq!(counts, vec![7, 8, 9]);
    }

    #[test]
    fn recent_counts_takes_tail() {
        let mut history = History::new(100);
        for i in 0..30 {
            history.push(snap(i));
        }
        let tail = history.recent_counts(20);
        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0], 10);
        assert_eq!(tail[19], 29);
    }

    #[test]
    fn recent_counts_short_history() {
        let mut history = History::new(100);
        history.push(snap(5));
        assert_eq!(history.recent_counts(20), vec![5]);
    }
}
