//! Bounded cache of loaded sounds keyed by URL.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use readalong_vocab::TriggerVocabulary;

use crate::playback::{AudioPlayback, SoundHandle};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Loaded sounds kept at once; least-recently-inserted is evicted on
    /// overflow.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 20 }
    }
}

/// Owns every loaded sound handle. Playback failures are local: logged,
/// reported as `false`, never escalated.
pub struct SoundCache {
    backend: Arc<dyn AudioPlayback>,
    max_entries: usize,
    handles: HashMap<String, SoundHandle>,
    /// URLs in insertion order, oldest first.
    insertion_order: VecDeque<String>,
}

impl SoundCache {
    pub fn new(backend: Arc<dyn AudioPlayback>, config: CacheConfig) -> Self {
        Self {
            backend,
            max_entries: config.max_entries.max(1),
            handles: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Sound URL for a canonical word: story mapping first, then the global
    /// table, else `None` (no sound available - not an error).
    pub fn resolve<'v>(&self, word: &str, vocabulary: &'v TriggerVocabulary) -> Option<&'v str> {
        vocabulary.resolve_sound(word)
    }

    /// Play `url` at `volume`, loading (and caching) on first use.
    ///
    /// The position is always rewound and the volume applied before play, so
    /// a rapid re-trigger of a different word never collides with a
    /// still-playing prior sound at the wrong volume.
    pub async fn play(&mut self, url: &str, volume: f32) -> bool {
        let handle = match self.handle_for(url).await {
            Some(h) => h,
            None => return false,
        };

        let result = async {
            self.backend.set_position_ms(handle, 0).await?;
            self.backend.set_volume(handle, volume).await?;
            self.backend.play(handle).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(target: "audio", url = %url, volume, "Playing sound");
                true
            }
            Err(e) => {
                warn!(target: "audio", url = %url, "Playback failed, skipping: {}", e);
                false
            }
        }
    }

    /// Ensure `url` is loaded and cached without playing it.
    ///
    /// Splitting the fetch from the audible effect lets the caller re-check
    /// session liveness after the (possibly slow) load completes.
    pub async fn prepare(&mut self, url: &str) -> bool {
        self.handle_for(url).await.is_some()
    }

    async fn handle_for(&mut self, url: &str) -> Option<SoundHandle> {
        if let Some(handle) = self.handles.get(url) {
            return Some(*handle);
        }

        let handle = match self.backend.load(url).await {
            Ok(h) => h,
            Err(e) => {
                warn!(target: "audio", url = %url, "Sound load failed, skipping: {}", e);
                return None;
            }
        };

        while self.handles.len() >= self.max_entries {
            self.evict_oldest().await;
        }

        self.handles.insert(url.to_string(), handle);
        self.insertion_order.push_back(url.to_string());
        Some(handle)
    }

    /// Unload the least-recently-inserted sound. Best effort.
    pub async fn evict_oldest(&mut self) {
        let Some(url) = self.insertion_order.pop_front() else {
            return;
        };
        if let Some(handle) = self.handles.remove(&url) {
            debug!(target: "audio", url = %url, "Evicting cached sound");
            if let Err(e) = self.backend.unload(handle).await {
                warn!(target: "audio", url = %url, "Unload failed: {}", e);
            }
        }
    }

    /// Stop every cached sound. Best effort, used when listening stops.
    pub async fn stop_all(&self) {
        for (url, handle) in &self.handles {
            if let Err(e) = self.backend.stop(*handle).await {
                warn!(target: "audio", url = %url, "Stop failed: {}", e);
            }
        }
    }

    /// Unload everything.
    pub async fn clear(&mut self) {
        while !self.insertion_order.is_empty() {
            self.evict_oldest().await;
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.handles.contains_key(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::AudioError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct FakeBackend {
        next_handle: AtomicU64,
        calls: Mutex<Vec<String>>,
        fail_loads: bool,
    }

    impl FakeBackend {
        fn failing() -> Self {
            Self {
                fail_loads: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait]
    impl AudioPlayback for FakeBackend {
        async fn load(&self, url: &str) -> Result<SoundHandle, AudioError> {
            if self.fail_loads {
                return Err(AudioError::LoadFailed {
                    url: url.to_string(),
                    reason: "offline".into(),
                });
            }
            self.record(format!("load {url}"));
            Ok(SoundHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
        }

        async fn set_position_ms(
            &self,
            handle: SoundHandle,
            position_ms: u64,
        ) -> Result<(), AudioError> {
            self.record(format!("seek {} {position_ms}", handle.0));
            Ok(())
        }

        async fn set_volume(&self, handle: SoundHandle, volume: f32) -> Result<(), AudioError> {
            self.record(format!("volume {} {volume}", handle.0));
            Ok(())
        }

        async fn play(&self, handle: SoundHandle) -> Result<(), AudioError> {
            self.record(format!("play {}", handle.0));
            Ok(())
        }

        async fn stop(&self, handle: SoundHandle) -> Result<(), AudioError> {
            self.record(format!("stop {}", handle.0));
            Ok(())
        }

        async fn unload(&self, handle: SoundHandle) -> Result<(), AudioError> {
            self.record(format!("unload {}", handle.0));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_play_rewinds_and_sets_volume_before_playing() {
        let backend = Arc::new(FakeBackend::default());
        let mut cache = SoundCache::new(backend.clone(), CacheConfig::default());

        assert!(cache.play("sounds/roar.ogg", 0.8).await);
        assert_eq!(
            backend.calls(),
            vec!["load sounds/roar.ogg", "seek 0 0", "volume 0 0.8", "play 0"]
        );
    }

    #[tokio::test]
    async fn test_second_play_hits_cache() {
        let backend = Arc::new(FakeBackend::default());
        let mut cache = SoundCache::new(backend.clone(), CacheConfig::default());

        cache.play("sounds/roar.ogg", 1.0).await;
        cache.play("sounds/roar.ogg", 1.0).await;
        let loads = backend
            .calls()
            .iter()
            .filter(|c| c.starts_with("load"))
            .count();
        assert_eq!(loads, 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fifo_eviction_unloads_oldest() {
        let backend = Arc::new(FakeBackend::default());
        let mut cache = SoundCache::new(backend.clone(), CacheConfig { max_entries: 2 });

        cache.play("a.ogg", 1.0).await;
        cache.play("b.ogg", 1.0).await;
        cache.play("c.ogg", 1.0).await;

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a.ogg"));
        assert!(cache.contains("b.ogg"));
        assert!(cache.contains("c.ogg"));
        // Handle 0 backed "a.ogg" and must have been unloaded.
        assert!(backend.calls().contains(&"unload 0".to_string()));
    }

    #[tokio::test]
    async fn test_load_failure_is_local() {
        let backend = Arc::new(FakeBackend::failing());
        let mut cache = SoundCache::new(backend, CacheConfig::default());

        assert!(!cache.play("missing.ogg", 1.0).await);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_stop_all_stops_every_cached_sound() {
        let backend = Arc::new(FakeBackend::default());
        let mut cache = SoundCache::new(backend.clone(), CacheConfig::default());

        cache.play("a.ogg", 1.0).await;
        cache.play("b.ogg", 1.0).await;
        cache.stop_all().await;

        let stops = backend
            .calls()
            .iter()
            .filter(|c| c.starts_with("stop"))
            .count();
        assert_eq!(stops, 2);
    }

    #[tokio::test]
    async fn test_clear_unloads_everything() {
        let backend = Arc::new(FakeBackend::default());
        let mut cache = SoundCache::new(backend.clone(), CacheConfig::default());

        cache.play("a.ogg", 1.0).await;
        cache.play("b.ogg", 1.0).await;
        cache.clear().await;

        assert!(cache.is_empty());
        let unloads = backend
            .calls()
            .iter()
            .filter(|c| c.starts_with("unload"))
            .count();
        assert_eq!(unloads, 2);
    }

    #[test]
    fn test_resolve_prefers_story_sound() {
        use std::collections::HashSet;
        let mut vocab = TriggerVocabulary::new();
        vocab.insert_global("roar", "global/roar.ogg", HashSet::new());
        vocab.insert_story("roar", "story/roar.ogg", HashSet::new());

        let backend = Arc::new(FakeBackend::default());
        let cache = SoundCache::new(backend, CacheConfig::default());
        assert_eq!(cache.resolve("roar", &vocab), Some("story/roar.ogg"));
        assert_eq!(cache.resolve("missing", &vocab), None);
    }
}
