//! Interface to the platform speech-recognition capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One recognition hypothesis for the current utterance.
#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub text: String,
    /// Confidence score (0.0-1.0).
    pub confidence: f32,
}

/// Lifecycle and result events emitted by the recognizer.
///
/// The platform adapter forwards its native callbacks onto a channel the
/// controller consumes, so ordering is exactly the order the platform
/// emitted them.
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// The recognizer actually began listening.
    Started,
    /// The recognizer stopped (end of speech, manual stop, or platform
    /// timeout).
    Ended,
    /// The recognizer failed; `message` carries the platform error string.
    Error { message: String },
    /// A partial or final transcript hypothesis set.
    Result { hypotheses: Vec<Hypothesis> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// BCP-47 language tag.
    pub language: String,
    /// Keep listening across utterance boundaries.
    pub continuous: bool,
    /// Emit partial hypotheses while speech is in progress.
    pub interim_results: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: true,
            interim_results: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Recognizer start failed: {0}")]
    StartFailed(String),

    #[error("Recognizer stop failed: {0}")]
    StopFailed(String),
}

/// Start/stop surface of the platform recognition capability.
///
/// Events flow back through the channel given to the controller, not through
/// return values; `start` succeeding only means the request was accepted.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn request_permission(&self) -> Result<bool, RecognizerError>;

    async fn start(&self, config: &RecognizerConfig) -> Result<(), RecognizerError>;

    async fn stop(&self) -> Result<(), RecognizerError>;
}
