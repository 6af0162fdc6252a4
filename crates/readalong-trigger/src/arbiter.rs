//! Playback arbitration: the per-word suppression window.
//!
//! A child reading "roar, ROAR!" should hear the lion once. The arbiter
//! keeps a ledger of last-played times per canonical word and rejects a
//! repeat inside the window. Session-liveness checks are the controller's
//! job; the arbiter only answers "has this word played too recently".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use readalong_foundation::clock::SharedClock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Repeats of the same word inside this window are suppressed.
    pub suppression_window_ms: u64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            suppression_window_ms: 2500,
        }
    }
}

pub struct PlaybackArbiter {
    clock: SharedClock,
    window: Duration,
    ledger: HashMap<String, Instant>,
}

impl PlaybackArbiter {
    pub fn new(clock: SharedClock, config: ArbiterConfig) -> Self {
        Self {
            clock,
            window: Duration::from_millis(config.suppression_window_ms),
            ledger: HashMap::new(),
        }
    }

    /// Would this word be allowed to play right now?
    pub fn should_play(&self, word: &str) -> bool {
        match self.ledger.get(word) {
            Some(last) => self.clock.now().duration_since(*last) >= self.window,
            None => true,
        }
    }

    /// Record that playback of `word` was accepted.
    pub fn record_play(&mut self, word: &str) {
        self.ledger.insert(word.to_string(), self.clock.now());
    }

    /// The combined decision the pipeline uses: accept and record in one
    /// step, so two matches in the same result cannot both pass.
    pub fn check_and_record(&mut self, word: &str) -> bool {
        if self.should_play(word) {
            self.record_play(word);
            true
        } else {
            debug!(target: "trigger", word = %word, "Suppressed repeat inside window");
            false
        }
    }

    /// Drop ledger entries older than the window. The ledger is small (one
    /// entry per distinct word spoken), so this is housekeeping rather than
    /// a correctness requirement.
    pub fn prune(&mut self) {
        let now = self.clock.now();
        let window = self.window;
        self.ledger
            .retain(|_, last| now.duration_since(*last) < window);
    }

    /// Forget everything. Called across session boundaries so no stale
    /// suppression leaks into the next listen.
    pub fn clear(&mut self) {
        self.ledger.clear();
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readalong_foundation::clock::ManualClock;
    use std::sync::Arc;

    fn arbiter(clock: Arc<ManualClock>) -> PlaybackArbiter {
        PlaybackArbiter::new(clock, ArbiterConfig::default())
    }

    #[test]
    fn test_first_play_accepted_and_recorded() {
        let clock = Arc::new(ManualClock::new());
        let mut arb = arbiter(clock);
        assert!(arb.check_and_record("roar"));
        assert!(!arb.should_play("roar"));
    }

    #[test]
    fn test_repeat_inside_window_suppressed() {
        let clock = Arc::new(ManualClock::new());
        let mut arb = arbiter(clock.clone());

        assert!(arb.check_and_record("roar"));
        clock.advance(Duration::from_millis(1000));
        assert!(!arb.check_and_record("roar"));
        // The rejection must not refresh the timestamp.
        clock.advance(Duration::from_millis(1500));
        assert!(arb.check_and_record("roar"));
    }

    #[test]
    fn test_repeat_after_window_accepted() {
        let clock = Arc::new(ManualClock::new());
        let mut arb = arbiter(clock.clone());

        assert!(arb.check_and_record("roar"));
        clock.advance(Duration::from_millis(2500));
        assert!(arb.check_and_record("roar"));
    }

    #[test]
    fn test_distinct_words_independent() {
        let clock = Arc::new(ManualClock::new());
        let mut arb = arbiter(clock);
        assert!(arb.check_and_record("roar"));
        assert!(arb.check_and_record("splash"));
    }

    #[test]
    fn test_prune_expires_old_entries() {
        let clock = Arc::new(ManualClock::new());
        let mut arb = arbiter(clock.clone());

        arb.record_play("roar");
        clock.advance(Duration::from_millis(3000));
        arb.record_play("splash");
        arb.prune();
        assert_eq!(arb.len(), 1);
        assert!(arb.should_play("roar"));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let clock = Arc::new(ManualClock::new());
        let mut arb = arbiter(clock);
        arb.record_play("roar");
        arb.clear();
        assert!(arb.is_empty());
        assert!(arb.should_play("roar"));
    }
}
