//! Demo runner for the read-along trigger engine.
//!
//! Replays a scripted recognition session - partial hypotheses, a duplicate,
//! a self-correction, optionally a transient error - through the full
//! pipeline with a logging audio backend, and prints every triggered word.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use readalong_audio::{AudioError, AudioPlayback, SoundHandle};
use readalong_foundation::clock::system_clock;
use readalong_session::{
    Hypothesis, PipelineMetrics, RecognitionEvent, RecognizerConfig, RecognizerError,
    SessionConfig, SessionController, SpeechRecognizer,
};
use readalong_vocab::{GlobalTriggerRow, StoryTriggerRow, VocabError, VocabularyStore};

#[derive(Parser, Debug)]
#[command(name = "readalong", about = "Read-along trigger engine demo")]
struct Args {
    /// Story whose trigger table to load.
    #[arg(long, default_value = "demo-story")]
    story_id: String,

    /// Playback volume for triggered sounds.
    #[arg(long, default_value_t = 1.0)]
    volume: f32,

    /// Log transcript text as len/hash instead of raw words.
    #[arg(long)]
    redact: bool,

    /// Fail the first recognizer start to demonstrate auto-retry.
    #[arg(long)]
    inject_error: bool,

    /// Milliseconds between scripted hypothesis frames.
    #[arg(long, default_value_t = 400)]
    frame_delay_ms: u64,
}

/// The hypothesis frames a real recognizer would emit while someone reads
/// the demo story aloud: cumulative growth, one duplicate, one correction,
/// and a fresh utterance.
const SCRIPT: &[&str] = &[
    "once upon a time",
    "once upon a time the lion",
    "once upon a time the lion",
    "once upon a time the lion roared",
    "once upon a time the lion roared at the thunder",
    "once upon a time the lion roared at the loud thunder",
    "the little cub splashed into the pond",
];

/// Recognizer that plays back [`SCRIPT`] after each successful start.
struct ScriptedRecognizer {
    events_tx: mpsc::Sender<RecognitionEvent>,
    fail_next_start: AtomicBool,
    frame_delay: Duration,
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn request_permission(&self) -> Result<bool, RecognizerError> {
        Ok(true)
    }

    async fn start(&self, _config: &RecognizerConfig) -> Result<(), RecognizerError> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(RecognizerError::StartFailed("recognition_fail (203)".into()));
        }

        let events_tx = self.events_tx.clone();
        let frame_delay = self.frame_delay;
        tokio::spawn(async move {
            let _ = events_tx.send(RecognitionEvent::Started).await;
            for frame in SCRIPT {
                tokio::time::sleep(frame_delay).await;
                let _ = events_tx
                    .send(RecognitionEvent::Result {
                        hypotheses: vec![Hypothesis {
                            text: frame.to_string(),
                            confidence: 0.9,
                        }],
                    })
                    .await;
            }
            let _ = events_tx.send(RecognitionEvent::Ended).await;
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), RecognizerError> {
        Ok(())
    }
}

/// Audio backend that logs instead of touching a device.
#[derive(Default)]
struct LoggingAudio {
    next_handle: std::sync::atomic::AtomicU64,
}

#[async_trait]
impl AudioPlayback for LoggingAudio {
    async fn load(&self, url: &str) -> Result<SoundHandle, AudioError> {
        // Mimic a short decode.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let handle = SoundHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        info!(target: "audio", url = %url, handle = handle.0, "Loaded sound");
        Ok(handle)
    }

    async fn set_position_ms(&self, _h: SoundHandle, _p: u64) -> Result<(), AudioError> {
        Ok(())
    }

    async fn set_volume(&self, _h: SoundHandle, _v: f32) -> Result<(), AudioError> {
        Ok(())
    }

    async fn play(&self, handle: SoundHandle) -> Result<(), AudioError> {
        info!(target: "audio", handle = handle.0, "Play");
        Ok(())
    }

    async fn stop(&self, _h: SoundHandle) -> Result<(), AudioError> {
        Ok(())
    }

    async fn unload(&self, handle: SoundHandle) -> Result<(), AudioError> {
        info!(target: "audio", handle = handle.0, "Unloaded sound");
        Ok(())
    }
}

/// In-memory stand-in for the vocabulary store.
struct DemoStore;

#[async_trait]
impl VocabularyStore for DemoStore {
    async fn global_trigger_words(&self) -> Result<Vec<GlobalTriggerRow>, VocabError> {
        Ok(vec![
            GlobalTriggerRow {
                word: "roar".into(),
                sound_url: "assets/sounds/roar.ogg".into(),
                category: "animals".into(),
            },
            GlobalTriggerRow {
                word: "thunder".into(),
                sound_url: "assets/sounds/thunder.ogg".into(),
                category: "weather".into(),
            },
            GlobalTriggerRow {
                word: "splash".into(),
                sound_url: "assets/sounds/splash.ogg".into(),
                category: "water".into(),
            },
        ])
    }

    async fn story_trigger_words(
        &self,
        story_id: &str,
        _personalized: bool,
    ) -> Result<Vec<StoryTriggerRow>, VocabError> {
        Ok(vec![StoryTriggerRow {
            word: "roar".into(),
            sound_url: format!("stories/{story_id}/roar.ogg"),
            position: 6,
        }])
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    info!("Starting read-along demo (story: {})", args.story_id);

    let (events_tx, events_rx) = mpsc::channel(64);
    let recognizer = Arc::new(ScriptedRecognizer {
        events_tx,
        fail_next_start: AtomicBool::new(args.inject_error),
        frame_delay: Duration::from_millis(args.frame_delay_ms),
    });

    let config = SessionConfig {
        story_id: args.story_id,
        volume: args.volume,
        redact_logs: args.redact,
        // Keep the demo snappy when --inject-error is on.
        retry_delay_ms: 1000,
        ..Default::default()
    };

    let (controller, handle) = SessionController::new(
        config,
        recognizer,
        Arc::new(LoggingAudio::default()),
        Arc::new(DemoStore),
        events_rx,
        system_clock(),
    );
    let mut triggers = handle.subscribe_triggers();
    tokio::spawn(controller.run());

    handle.enable().await;
    handle.toggle_listening().await;

    // Print triggers until the script has been quiet for a while.
    loop {
        match tokio::time::timeout(Duration::from_secs(5), triggers.recv()).await {
            Ok(Ok(triggered)) => {
                println!(
                    "triggered: {:<10} (sound {})",
                    triggered.word,
                    if triggered.sound_played { "played" } else { "skipped" }
                );
            }
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }

    if let Some(error) = handle.current_error() {
        println!("session error: {error}");
    }

    let metrics = handle.metrics();
    println!(
        "done: {} hypotheses, {} matches, {} sounds played, {} suppressed",
        PipelineMetrics::get(&metrics.hypotheses_in),
        PipelineMetrics::get(&metrics.words_matched),
        PipelineMetrics::get(&metrics.sounds_played),
        PipelineMetrics::get(&metrics.suppressed_repeats),
    );

    handle.disable().await;
}
