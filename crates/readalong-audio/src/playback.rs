//! Platform audio-output capability.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to load sound {url}: {reason}")]
    LoadFailed { url: String, reason: String },

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("Unknown sound handle")]
    UnknownHandle,
}

/// Opaque identifier for a loaded sound resource, issued by the backend.
///
/// Handles are owned by the [`SoundCache`](crate::cache::SoundCache);
/// nothing else holds one past the call that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u64);

/// Decode/play/stop/unload an audio resource by URL.
///
/// Implemented by the platform audio layer outside this engine. All methods
/// may suspend (disk or network fetch behind `load`, device calls behind the
/// rest).
#[async_trait]
pub trait AudioPlayback: Send + Sync {
    async fn load(&self, url: &str) -> Result<SoundHandle, AudioError>;

    /// Seek to a position in milliseconds from the start.
    async fn set_position_ms(&self, handle: SoundHandle, position_ms: u64)
        -> Result<(), AudioError>;

    /// Volume in 0.0..=1.0.
    async fn set_volume(&self, handle: SoundHandle, volume: f32) -> Result<(), AudioError>;

    async fn play(&self, handle: SoundHandle) -> Result<(), AudioError>;

    async fn stop(&self, handle: SoundHandle) -> Result<(), AudioError>;

    async fn unload(&self, handle: SoundHandle) -> Result<(), AudioError>;
}
