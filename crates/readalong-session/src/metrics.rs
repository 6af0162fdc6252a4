//! Shared counters for observing the trigger pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cloneable handle onto the pipeline counters.
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    /// Raw hypothesis sets received while listening.
    pub hypotheses_in: Arc<AtomicU64>,
    /// Tokens that survived reconciliation and length filtering.
    pub words_extracted: Arc<AtomicU64>,
    /// Tokens that matched a trigger word or variant.
    pub words_matched: Arc<AtomicU64>,
    /// Sounds actually played.
    pub sounds_played: Arc<AtomicU64>,
    /// Matches rejected by the suppression window.
    pub suppressed_repeats: Arc<AtomicU64>,
    /// Sound load/play failures (local, skipped).
    pub playback_failures: Arc<AtomicU64>,
    /// Auto-retries scheduled after transient errors.
    pub retries_scheduled: Arc<AtomicU64>,
    /// Session-level errors surfaced to the caller.
    pub session_errors: Arc<AtomicU64>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics")
            .field("hypotheses_in", &Self::get(&self.hypotheses_in))
            .field("words_extracted", &Self::get(&self.words_extracted))
            .field("words_matched", &Self::get(&self.words_matched))
            .field("sounds_played", &Self::get(&self.sounds_played))
            .field("suppressed_repeats", &Self::get(&self.suppressed_repeats))
            .field("playback_failures", &Self::get(&self.playback_failures))
            .field("retries_scheduled", &Self::get(&self.retries_scheduled))
            .field("session_errors", &Self::get(&self.session_errors))
            .finish()
    }
}
