//! The trigger pipeline: turn raw speech hypotheses into at-most-once sound
//! triggers.
//!
//! Everything in this crate is synchronous and allocation-light; the async
//! boundaries (vocabulary loading, sound playback) live in the session and
//! audio crates.

pub mod arbiter;
pub mod matcher;
pub mod reconciler;

pub use arbiter::{ArbiterConfig, PlaybackArbiter};
pub use matcher::match_tokens;
pub use reconciler::{extract_tokens, reconcile, TranscriptTracker};
