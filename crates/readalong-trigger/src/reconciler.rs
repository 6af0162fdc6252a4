//! Transcript reconciliation.
//!
//! Recognition engines re-emit the whole hypothesis on every partial result,
//! and sometimes rewrite trailing words they previously got wrong. The
//! reconciler compares the latest hypothesis against the text already acted
//! upon and yields only the newly spoken content, so downstream matching
//! never reacts to a word twice.

use tracing::debug;

/// Minimum share of `previous`'s tokens that must survive as a prefix of
/// `current` for the hypothesis to count as a self-correction rather than a
/// fresh utterance. The distinction only affects logging; both cases emit
/// the suffix after the common prefix.
const CORRECTION_OVERLAP_RATIO: f32 = 0.7;

/// Tokens shorter than this never reach the matcher. Filler fragments
/// ("a", "um", "of") are where false positives come from.
const MIN_TOKEN_LEN: usize = 3;

/// Extract the newly spoken content of `current` given that `previous` has
/// already been processed.
pub fn reconcile(previous: &str, current: &str) -> String {
    let previous = previous.trim();
    let current = current.trim();

    if current.is_empty() {
        return String::new();
    }

    // Duplicate interim result.
    if current.eq_ignore_ascii_case(previous) {
        return String::new();
    }

    // Append-only growth: the common case while a sentence is being spoken.
    if let Some(prefix) = current.get(..previous.len()) {
        if prefix.eq_ignore_ascii_case(previous) {
            return clean_new_content(&current[previous.len()..]);
        }
    }

    // The hypothesis diverged. Count how many leading tokens survived and
    // emit only what follows them.
    let prev_tokens: Vec<&str> = previous.split_whitespace().collect();
    let cur_tokens: Vec<&str> = current.split_whitespace().collect();

    let overlap = prev_tokens
        .iter()
        .zip(cur_tokens.iter())
        .take_while(|(p, c)| p.eq_ignore_ascii_case(c))
        .count();

    let overlap_ratio = if prev_tokens.is_empty() {
        0.0
    } else {
        overlap as f32 / prev_tokens.len() as f32
    };

    if overlap_ratio >= CORRECTION_OVERLAP_RATIO {
        debug!(
            target: "reconcile",
            overlap,
            ratio = overlap_ratio,
            "Self-correction: recognizer revised trailing words"
        );
    } else {
        debug!(
            target: "reconcile",
            overlap,
            ratio = overlap_ratio,
            "Low overlap: new utterance or recognizer reset"
        );
    }

    // Never re-emit the overlapping prefix; those words were already handled.
    clean_new_content(&cur_tokens[overlap..].join(" "))
}

/// Whitespace- or punctuation-only content collapses to empty.
fn clean_new_content(content: &str) -> String {
    let content = content.trim();
    if content.chars().any(|c| c.is_alphanumeric()) {
        content.to_string()
    } else {
        String::new()
    }
}

/// Split new content into tokens worth matching.
pub fn extract_tokens(new_content: &str) -> Vec<String> {
    new_content
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_string())
        .collect()
}

/// Owns the per-session reconciliation state.
///
/// After each hypothesis the baseline becomes the full hypothesis - not
/// baseline + new content - so the tracker stays anchored to what the
/// recognizer actually believes and cannot accumulate drift. Reset on
/// session start, session end, and on error.
#[derive(Debug, Default)]
pub struct TranscriptTracker {
    processed_text: String,
}

impl TranscriptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest raw hypothesis; returns the newly spoken content.
    pub fn ingest(&mut self, hypothesis: &str) -> String {
        let new_content = reconcile(&self.processed_text, hypothesis);
        let trimmed = hypothesis.trim();
        if !trimmed.is_empty() {
            self.processed_text = trimmed.to_string();
        }
        new_content
    }

    pub fn processed_text(&self) -> &str {
        &self.processed_text
    }

    pub fn reset(&mut self) {
        self.processed_text.clear();
    }
}
