use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where a trigger word was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSource {
    Story,
    Global,
}

/// Row shape of the global trigger-word table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalTriggerRow {
    pub word: String,
    pub sound_url: String,
    pub category: String,
}

/// Row shape of a story-specific trigger-word table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryTriggerRow {
    pub word: String,
    pub sound_url: String,
    /// Word position within the story text, used by reading-progress UI.
    pub position: u32,
}

/// One canonical trigger word with its variants and sound resources.
///
/// When the same word appears in both the story and global tables the
/// variant sets are unioned and both sound URLs are kept; resolution prefers
/// the story sound (`TriggerVocabulary::resolve_sound`).
#[derive(Debug, Clone, Default)]
pub struct TriggerEntry {
    pub variants: HashSet<String>,
    pub story_sound_url: Option<String>,
    pub global_sound_url: Option<String>,
}

impl TriggerEntry {
    pub fn source(&self) -> WordSource {
        if self.story_sound_url.is_some() {
            WordSource::Story
        } else {
            WordSource::Global
        }
    }
}

/// Immutable-once-built mapping from canonical trigger word to its entry.
#[derive(Debug, Clone, Default)]
pub struct TriggerVocabulary {
    entries: HashMap<String, TriggerEntry>,
}

impl TriggerVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_global(&mut self, word: &str, sound_url: &str, variants: HashSet<String>) {
        let entry = self.entries.entry(word.to_lowercase()).or_default();
        entry.variants.extend(variants);
        entry.global_sound_url = Some(sound_url.to_string());
    }

    pub fn insert_story(&mut self, word: &str, sound_url: &str, variants: HashSet<String>) {
        let entry = self.entries.entry(word.to_lowercase()).or_default();
        entry.variants.extend(variants);
        entry.story_sound_url = Some(sound_url.to_string());
    }

    pub fn entry(&self, word: &str) -> Option<&TriggerEntry> {
        self.entries.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// Iterate over (canonical word, entry) pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TriggerEntry)> {
        self.entries.iter()
    }

    /// Resolve the sound for a canonical word: story mapping first, then the
    /// global table. `None` means no sound is available, which is not an
    /// error - the word is simply skipped.
    pub fn resolve_sound(&self, word: &str) -> Option<&str> {
        let entry = self.entries.get(word)?;
        entry
            .story_sound_url
            .as_deref()
            .or(entry.global_sound_url.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
