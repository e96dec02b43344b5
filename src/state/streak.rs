use serde::{Deserialize, Serialize};

/// Consecutive-sample streak counters: how long the game has been empty
/// (0 players) or active (>0), plus the longest run of each seen so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub empty_streak: u64,
    pub active_streak: u64,
    pub longest_empty: u64,
    pub longest_active: u64,
}

impl StreakState {
    /// Advance by one sample. Exactly one of the two counters grows; the
    /// other resets at the sample where the regime changes.
    pub fn update(&mut self, playing: u64) {
        if playing == 0 {
            self.empty_streak += 1;
            self.active_streak = 0;
            self.longest_empty = self.longest_empty.max(self.empty_streak);
        } else {
            self.active_streak += 1;
            self.empty_streak = 0;
            self.longest_active = self.longest_active.max(self.active_streak);
        }
    }
}
