//! Trigger-word vocabulary for the read-along engine.
//!
//! A vocabulary maps canonical trigger words (lowercase) to their
//! morphological variants and sound resources. It is built by unioning the
//! global trigger-word table with the story-specific table for the story
//! currently being read, and rebuilt when the active story changes.

pub mod builtin;
pub mod loader;
pub mod store;
pub mod types;

pub use loader::{LoaderConfig, VocabularyLoader};
pub use store::{VocabError, VocabularyStore};
pub use types::{GlobalTriggerRow, StoryTriggerRow, TriggerEntry, TriggerVocabulary, WordSource};
