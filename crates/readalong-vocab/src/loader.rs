//! Builds the active vocabulary by merging store tables, with a TTL cache
//! and a built-in fallback so a store outage never blocks the reader.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use readalong_foundation::clock::SharedClock;

use crate::builtin::BUILTIN_TRIGGERS;
use crate::store::VocabularyStore;
use crate::types::TriggerVocabulary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// How long a built vocabulary stays fresh before the store is consulted
    /// again.
    pub ttl_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

struct CacheSlot {
    key: (String, bool),
    built_at: Instant,
    vocab: Arc<TriggerVocabulary>,
}

pub struct VocabularyLoader {
    store: Arc<dyn VocabularyStore>,
    clock: SharedClock,
    ttl: Duration,
    cached: Mutex<Option<CacheSlot>>,
}

impl VocabularyLoader {
    pub fn new(store: Arc<dyn VocabularyStore>, clock: SharedClock, config: LoaderConfig) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::from_secs(config.ttl_secs),
            cached: Mutex::new(None),
        }
    }

    /// Vocabulary for the given story, served from cache while fresh.
    ///
    /// Never fails: a store error falls back to the built-in list.
    pub async fn load(&self, story_id: &str, personalized: bool) -> Arc<TriggerVocabulary> {
        let key = (story_id.to_string(), personalized);
        let now = self.clock.now();

        if let Some(slot) = self.cached.lock().as_ref() {
            if slot.key == key && now.duration_since(slot.built_at) < self.ttl {
                return Arc::clone(&slot.vocab);
            }
        }

        let vocab = Arc::new(self.build(story_id, personalized).await);
        *self.cached.lock() = Some(CacheSlot {
            key,
            built_at: now,
            vocab: Arc::clone(&vocab),
        });
        vocab
    }

    /// Drop the cached vocabulary, forcing a rebuild on the next load.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    async fn build(&self, story_id: &str, personalized: bool) -> TriggerVocabulary {
        let mut vocab = TriggerVocabulary::new();

        match self.store.global_trigger_words().await {
            Ok(rows) => {
                for row in &rows {
                    vocab.insert_global(&row.word, &row.sound_url, expand_variants(&row.word));
                }
                debug!(target: "vocab", "Loaded {} global trigger words", rows.len());
            }
            Err(e) => {
                warn!(target: "vocab", "Global trigger words unavailable, using built-ins: {}", e);
                for (word, url) in BUILTIN_TRIGGERS {
                    vocab.insert_global(word, url, expand_variants(word));
                }
            }
        }

        match self.store.story_trigger_words(story_id, personalized).await {
            Ok(rows) => {
                for row in &rows {
                    vocab.insert_story(&row.word, &row.sound_url, expand_variants(&row.word));
                }
                debug!(
                    target: "vocab",
                    "Loaded {} story trigger words for {}", rows.len(), story_id
                );
            }
            Err(e) => {
                // Story words are an enrichment; the global set still works.
                warn!(target: "vocab", "Story trigger words unavailable for {}: {}", story_id, e);
            }
        }

        vocab
    }
}

/// Known morphological variants of a trigger word: plural, past, gerund.
pub fn expand_variants(word: &str) -> HashSet<String> {
    let word = word.to_lowercase();
    let mut variants = HashSet::new();

    if word.ends_with('s') || word.ends_with('x') || word.ends_with('z') {
        variants.insert(format!("{word}es"));
    } else {
        variants.insert(format!("{word}s"));
    }

    if let Some(stem) = word.strip_suffix('e') {
        variants.insert(format!("{word}d"));
        variants.insert(format!("{stem}ing"));
    } else {
        variants.insert(format!("{word}ed"));
        variants.insert(format!("{word}ing"));
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VocabError;
    use crate::types::{GlobalTriggerRow, StoryTriggerRow};
    use async_trait::async_trait;
    use readalong_foundation::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeStore {
        fail_global: bool,
        global_calls: AtomicU32,
    }

    impl FakeStore {
        fn new(fail_global: bool) -> Self {
            Self {
                fail_global,
                global_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl VocabularyStore for FakeStore {
        async fn global_trigger_words(&self) -> Result<Vec<GlobalTriggerRow>, VocabError> {
            self.global_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_global {
                return Err(VocabError::StoreUnavailable("offline".into()));
            }
            Ok(vec![GlobalTriggerRow {
                word: "roar".into(),
                sound_url: "sounds/roar.ogg".into(),
                category: "animals".into(),
            }])
        }

        async fn story_trigger_words(
            &self,
            _story_id: &str,
            _personalized: bool,
        ) -> Result<Vec<StoryTriggerRow>, VocabError> {
            Ok(vec![StoryTriggerRow {
                word: "splash".into(),
                sound_url: "stories/1/splash.ogg".into(),
                position: 12,
            }])
        }
    }

    #[test]
    fn test_variant_expansion() {
        let v = expand_variants("roar");
        assert!(v.contains("roars"));
        assert!(v.contains("roared"));
        assert!(v.contains("roaring"));

        let v = expand_variants("sneeze");
        assert!(v.contains("sneezes"));
        assert!(v.contains("sneezed"));
        assert!(v.contains("sneezing"));

        let v = expand_variants("hiss");
        assert!(v.contains("hisses"));
    }

    #[tokio::test]
    async fn test_merges_story_and_global() {
        let clock = Arc::new(ManualClock::new());
        let loader = VocabularyLoader::new(
            Arc::new(FakeStore::new(false)),
            clock,
            LoaderConfig::default(),
        );

        let vocab = loader.load("story-1", false).await;
        assert!(vocab.contains("roar"));
        assert!(vocab.contains("splash"));
        assert_eq!(vocab.resolve_sound("splash"), Some("stories/1/splash.ogg"));
    }

    #[tokio::test]
    async fn test_falls_back_to_builtin_on_store_failure() {
        let clock = Arc::new(ManualClock::new());
        let loader = VocabularyLoader::new(
            Arc::new(FakeStore::new(true)),
            clock,
            LoaderConfig::default(),
        );

        let vocab = loader.load("story-1", false).await;
        // Built-ins fill in for the unavailable global table.
        assert!(vocab.contains("thunder"));
        assert!(vocab.contains("roar"));
        // The story table still contributed.
        assert!(vocab.contains("splash"));
    }

    #[tokio::test]
    async fn test_ttl_cache_serves_and_expires() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(FakeStore::new(false));
        let loader = VocabularyLoader::new(
            store.clone(),
            clock.clone(),
            LoaderConfig { ttl_secs: 300 },
        );

        loader.load("story-1", false).await;
        loader.load("story-1", false).await;
        assert_eq!(store.global_calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(301));
        loader.load("story-1", false).await;
        assert_eq!(store.global_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_story_change_rebuilds() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(FakeStore::new(false));
        let loader =
            VocabularyLoader::new(store.clone(), clock, LoaderConfig::default());

        loader.load("story-1", false).await;
        loader.load("story-2", false).await;
        assert_eq!(store.global_calls.load(Ordering::SeqCst), 2);
    }
}
