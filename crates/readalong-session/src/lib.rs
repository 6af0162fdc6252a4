//! Recognition session lifecycle and the trigger pipeline wiring.
//!
//! The [`SessionController`] owns one listening session at a time: it starts
//! and stops the platform recognizer, routes raw hypotheses through
//! reconciliation, matching, and arbitration, and recovers from transient
//! recognizer failures with bounded auto-retry.

pub mod controller;
pub mod metrics;
pub mod recognition;

pub use controller::{
    Command, ControllerHandle, ControllerState, SessionConfig, SessionController, TriggeredWord,
};
pub use metrics::PipelineMetrics;
pub use recognition::{Hypothesis, RecognitionEvent, RecognizerConfig, RecognizerError, SpeechRecognizer};
