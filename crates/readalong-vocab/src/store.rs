//! Interface to the external vocabulary persistence store.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{GlobalTriggerRow, StoryTriggerRow};

#[derive(Debug, Error)]
pub enum VocabError {
    #[error("Vocabulary store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed trigger row: {0}")]
    Malformed(String),
}

/// Lookup of story-specific and global trigger words.
///
/// Implemented by the persistence layer outside this engine; the loader only
/// ever reads. Failures here are absorbed by the loader's built-in fallback
/// and never surface to the user.
#[async_trait]
pub trait VocabularyStore: Send + Sync {
    async fn global_trigger_words(&self) -> Result<Vec<GlobalTriggerRow>, VocabError>;

    async fn story_trigger_words(
        &self,
        story_id: &str,
        personalized: bool,
    ) -> Result<Vec<StoryTriggerRow>, VocabError>;
}
