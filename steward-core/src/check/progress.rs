//! Round-over-round memory for one instance's wait.

use std::time::Duration;

use tokio::time::Instant;

use super::group::GroupOutcome;

/// Tracks how one instance's observed state evolves across poll rounds.
///
/// The runner calls [`CheckProgress::observe`] after every round; checks
/// read the derived clocks during the next round. During round `n` the
/// progress therefore describes rounds `1..n`.
#[derive(Debug, Clone)]
pub struct CheckProgress {
    started_at: Instant,
    rounds: u64,
    state_changes: u64,
    state_digest: Option<u64>,
    state_since: Instant,
    unavailable_since: Option<Instant>,
    last_summary: String,
}

impl CheckProgress {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started_at: now,
            rounds: 0,
            state_changes: 0,
            state_digest: None,
            state_since: now,
            unavailable_since: None,
            last_summary: String::new(),
        }
    }

    /// Folds one round's outcome into the tracked state. Returns true when
    /// the observed state differs from the previous round's.
    pub fn observe(&mut self, outcome: &GroupOutcome) -> bool {
        let now = Instant::now();
        self.rounds += 1;

        let digest = outcome.state_digest();
        let changed = self.state_digest != Some(digest);
        if changed {
            if self.state_digest.is_some() {
                self.state_changes += 1;
            }
            self.state_digest = Some(digest);
            self.state_since = now;
        }

        if outcome.reachable() {
            self.unavailable_since = None;
        } else if self.unavailable_since.is_none() {
            self.unavailable_since = Some(now);
        }

        self.last_summary = outcome.summary();
        changed
    }

    /// Completed rounds so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Observed state transitions, not counting the first observation.
    pub fn state_changes(&self) -> u64 {
        self.state_changes
    }

    /// How long the observed state has been unchanged.
    pub fn state_time(&self) -> Duration {
        self.state_since.elapsed()
    }

    /// How long the instance has been continuously unreachable, `None` when
    /// it currently answers.
    pub fn unavailable_for(&self) -> Option<Duration> {
        self.unavailable_since.map(|since| since.elapsed())
    }

    /// Time since the wait started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn last_summary(&self) -> &str {
        &self.last_summary
    }
}

impl Default for CheckProgress {
    fn default() -> Self {
        Self::new()
    }
}
