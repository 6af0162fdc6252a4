use std::time::Duration;
use thiserror::Error;

/// Session-level errors that reach the caller-visible error surface.
///
/// Everything below this level (sound load/play failures, vocabulary store
/// failures) is absorbed where it happens and never becomes a `SessionError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Speech recognition unavailable: {0}")]
    Unavailable(String),

    #[error("Transient recognition failure: {0}")]
    Transient(String),

    #[error("Recognition failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

/// Error signatures the platform recognizer emits for failures that clear up
/// on their own (flaky network, a dropped capture stream, silence timeouts).
const TRANSIENT_SIGNATURES: &[&str] = &[
    "recognition_fail",
    "network",
    "no-speech",
    "audio-capture",
    "aborted",
];

/// Error signatures that mean the user or platform refused access.
const PERMISSION_SIGNATURES: &[&str] = &["not-allowed", "permission", "service-not-allowed"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Schedule a delayed restart, up to `max_attempts` consecutive failures.
    AutoRetry { max_attempts: u32, delay: Duration },
    /// Surface to the caller and wait for a manual retry.
    Surface,
}

pub const MAX_AUTO_RETRIES: u32 = 3;
pub const AUTO_RETRY_DELAY: Duration = Duration::from_millis(5000);

impl SessionError {
    /// Classify a raw recognizer error message into the session taxonomy.
    pub fn from_recognizer_message(message: &str) -> Self {
        let lowered = message.to_lowercase();

        if PERMISSION_SIGNATURES.iter().any(|s| lowered.contains(s)) {
            return SessionError::PermissionDenied;
        }
        if TRANSIENT_SIGNATURES.iter().any(|s| lowered.contains(s)) {
            return SessionError::Transient(message.to_string());
        }
        SessionError::Unavailable(message.to_string())
    }

    pub fn retry_strategy(&self) -> RetryStrategy {
        match self {
            SessionError::Transient(_) => RetryStrategy::AutoRetry {
                max_attempts: MAX_AUTO_RETRIES,
                delay: AUTO_RETRY_DELAY,
            },
            SessionError::PermissionDenied
            | SessionError::Unavailable(_)
            | SessionError::RetriesExhausted { .. } => RetryStrategy::Surface,
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self.retry_strategy(), RetryStrategy::AutoRetry { .. })
    }
}
