//! Sound-effect playback for the read-along engine.
//!
//! The platform audio capability is consumed through the [`AudioPlayback`]
//! trait; the [`SoundCache`] owns every loaded handle and is the only
//! component allowed to unload one.

pub mod cache;
pub mod playback;

pub use cache::{CacheConfig, SoundCache};
pub use playback::{AudioError, AudioPlayback, SoundHandle};
