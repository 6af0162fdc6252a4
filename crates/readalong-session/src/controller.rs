//! The recognition session controller.
//!
//! Owns the lifecycle of one listening session, wires recognizer events
//! through the trigger pipeline, and runs the bounded auto-retry machine on
//! transient recognizer failures.
//!
//! Cancellation works through a session generation counter: every async
//! continuation captures the generation it started under and re-checks it
//! after each await. Disabling or stopping bumps the counter immediately
//! (from the handle, without waiting for the command queue), so a slow sound
//! fetch that resumes after the user stopped listening becomes a no-op.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use readalong_audio::{AudioPlayback, CacheConfig, SoundCache};
use readalong_foundation::clock::SharedClock;
use readalong_foundation::error::{RetryStrategy, SessionError};
use readalong_trigger::{
    extract_tokens, match_tokens, ArbiterConfig, PlaybackArbiter, TranscriptTracker,
};
use readalong_vocab::{LoaderConfig, VocabularyLoader, VocabularyStore};

use crate::metrics::PipelineMetrics;
use crate::recognition::{Hypothesis, RecognitionEvent, RecognizerConfig, SpeechRecognizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Read-along mode off; nothing reacts.
    Disabled,
    /// Enabled but not listening.
    Idle,
    /// A recognition session is live.
    Listening,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Disabled => write!(f, "DISABLED"),
            ControllerState::Idle => write!(f, "IDLE"),
            ControllerState::Listening => write!(f, "LISTENING"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub recognizer: RecognizerConfig,
    pub arbiter: ArbiterConfig,
    pub cache: CacheConfig,
    pub loader: LoaderConfig,
    /// Story whose trigger table is merged with the global one.
    pub story_id: String,
    pub personalized: bool,
    /// Playback volume for triggered sounds, 0.0..=1.0.
    pub volume: f32,
    /// Consecutive retriable failures tolerated before surfacing.
    pub max_auto_retries: u32,
    /// Delay before an automatic restart attempt.
    pub retry_delay_ms: u64,
    /// Log transcript text as `len/hash` instead of raw words.
    pub redact_logs: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerConfig::default(),
            arbiter: ArbiterConfig::default(),
            cache: CacheConfig::default(),
            loader: LoaderConfig::default(),
            story_id: String::new(),
            personalized: false,
            volume: 1.0,
            max_auto_retries: 3,
            retry_delay_ms: 5000,
            redact_logs: false,
        }
    }
}

/// A word that passed reconciliation, matching, arbitration, and the final
/// liveness check.
#[derive(Debug, Clone)]
pub struct TriggeredWord {
    pub word: String,
    /// False when no sound resource exists or playback failed; the word
    /// still counts as triggered for reading-progress UI.
    pub sound_played: bool,
}

/// Commands accepted by the controller loop.
#[derive(Debug, Clone)]
pub enum Command {
    Enable,
    Disable,
    ToggleListening,
    ManualRetry,
    SetStory {
        story_id: String,
        personalized: bool,
    },
    /// Internal: a scheduled retry timer fired. Carries the generation it
    /// was scheduled under so a stale timer is dropped.
    AutoRetry {
        generation: u64,
    },
}

#[derive(Debug, Default)]
struct RetryState {
    auto_retry_count: u32,
    has_retriable_error: bool,
}

/// Cloneable front door to a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    commands_tx: mpsc::Sender<Command>,
    generation: Arc<AtomicU64>,
    state: Arc<RwLock<ControllerState>>,
    current_error: Arc<RwLock<Option<SessionError>>>,
    triggers_tx: broadcast::Sender<TriggeredWord>,
    state_rx: crossbeam_channel::Receiver<ControllerState>,
    metrics: PipelineMetrics,
}

impl ControllerHandle {
    pub async fn enable(&self) {
        self.send(Command::Enable).await;
    }

    /// Disable read-along mode. The generation bump happens here, before the
    /// command is even queued, so in-flight pipeline work is invalidated
    /// immediately.
    pub async fn disable(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.send(Command::Disable).await;
    }

    pub async fn toggle_listening(&self) {
        // Toggling off is a manual stop; invalidate in-flight work now.
        if *self.state.read() == ControllerState::Listening {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.send(Command::ToggleListening).await;
    }

    /// Explicit user retry: resets the auto-retry counter and starts again.
    pub async fn manual_retry(&self) {
        self.send(Command::ManualRetry).await;
    }

    pub async fn set_story(&self, story_id: &str, personalized: bool) {
        self.send(Command::SetStory {
            story_id: story_id.to_string(),
            personalized,
        })
        .await;
    }

    pub fn clear_error(&self) {
        *self.current_error.write() = None;
    }

    pub fn current_error(&self) -> Option<SessionError> {
        self.current_error.read().clone()
    }

    pub fn state(&self) -> ControllerState {
        *self.state.read()
    }

    pub fn subscribe_triggers(&self) -> broadcast::Receiver<TriggeredWord> {
        self.triggers_tx.subscribe()
    }

    pub fn subscribe_state(&self) -> crossbeam_channel::Receiver<ControllerState> {
        self.state_rx.clone()
    }

    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.clone()
    }

    async fn send(&self, command: Command) {
        if self.commands_tx.send(command).await.is_err() {
            debug!(target: "session", "Controller loop gone, command dropped");
        }
    }
}

pub struct SessionController {
    config: SessionConfig,
    recognizer: Arc<dyn SpeechRecognizer>,
    events_rx: mpsc::Receiver<RecognitionEvent>,
    commands_rx: mpsc::Receiver<Command>,
    commands_tx: mpsc::Sender<Command>,
    loader: VocabularyLoader,
    cache: SoundCache,
    tracker: TranscriptTracker,
    arbiter: PlaybackArbiter,
    state: Arc<RwLock<ControllerState>>,
    generation: Arc<AtomicU64>,
    retry: RetryState,
    current_error: Arc<RwLock<Option<SessionError>>>,
    triggers_tx: broadcast::Sender<TriggeredWord>,
    state_tx: crossbeam_channel::Sender<ControllerState>,
    metrics: PipelineMetrics,
    session_started_at: Option<Instant>,
    clock: SharedClock,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        recognizer: Arc<dyn SpeechRecognizer>,
        audio: Arc<dyn AudioPlayback>,
        store: Arc<dyn VocabularyStore>,
        events_rx: mpsc::Receiver<RecognitionEvent>,
        clock: SharedClock,
    ) -> (Self, ControllerHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (triggers_tx, _) = broadcast::channel(64);
        let (state_tx, state_rx) = crossbeam_channel::unbounded();

        let state = Arc::new(RwLock::new(ControllerState::Disabled));
        let generation = Arc::new(AtomicU64::new(0));
        let current_error = Arc::new(RwLock::new(None));
        let metrics = PipelineMetrics::new();

        let handle = ControllerHandle {
            commands_tx: commands_tx.clone(),
            generation: Arc::clone(&generation),
            state: Arc::clone(&state),
            current_error: Arc::clone(&current_error),
            triggers_tx: triggers_tx.clone(),
            state_rx,
            metrics: metrics.clone(),
        };

        let controller = Self {
            loader: VocabularyLoader::new(store, Arc::clone(&clock), config.loader.clone()),
            cache: SoundCache::new(audio, config.cache.clone()),
            tracker: TranscriptTracker::new(),
            arbiter: PlaybackArbiter::new(Arc::clone(&clock), config.arbiter.clone()),
            config,
            recognizer,
            events_rx,
            commands_rx,
            commands_tx,
            state,
            generation,
            retry: RetryState::default(),
            current_error,
            triggers_tx,
            state_tx,
            metrics,
            session_started_at: None,
            clock,
        };

        (controller, handle)
    }

    /// Drive the controller until both channels close.
    pub async fn run(mut self) {
        info!(target: "session", "Session controller starting in {} state", self.state());

        loop {
            tokio::select! {
                Some(command) = self.commands_rx.recv() => {
                    self.handle_command(command).await;
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                }
                else => {
                    info!(target: "session", "Session controller shutting down: channels closed");
                    break;
                }
            }
        }

        debug!(target: "session", metrics = ?self.metrics, "Final pipeline metrics");
    }

    pub fn state(&self) -> ControllerState {
        *self.state.read()
    }

    pub async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enable => self.enable(),
            Command::Disable => self.disable().await,
            Command::ToggleListening => self.toggle_listening().await,
            Command::ManualRetry => self.manual_retry().await,
            Command::SetStory {
                story_id,
                personalized,
            } => self.set_story(story_id, personalized),
            Command::AutoRetry { generation } => self.auto_retry(generation).await,
        }
    }

    pub async fn handle_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => self.handle_started(),
            RecognitionEvent::Ended => self.handle_ended(),
            RecognitionEvent::Error { message } => self.handle_error(&message).await,
            RecognitionEvent::Result { hypotheses } => self.handle_result(hypotheses).await,
        }
    }

    fn enable(&mut self) {
        if self.state() != ControllerState::Disabled {
            debug!(target: "session", "Already enabled");
            return;
        }
        self.set_state(ControllerState::Idle);
    }

    async fn disable(&mut self) {
        if self.state() == ControllerState::Disabled {
            return;
        }
        // The handle already bumped the generation; bump again here so a
        // direct call without a handle is just as safe.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.state() == ControllerState::Listening {
            if let Err(e) = self.recognizer.stop().await {
                warn!(target: "session", "Recognizer stop failed on disable: {}", e);
            }
        }
        self.cache.stop_all().await;
        self.tracker.reset();
        self.arbiter.clear();
        self.retry = RetryState::default();
        self.session_started_at = None;
        self.set_state(ControllerState::Disabled);
    }

    async fn toggle_listening(&mut self) {
        match self.state() {
            ControllerState::Disabled => {
                warn!(target: "session", "Toggle ignored while disabled");
            }
            ControllerState::Idle => self.start_listening().await,
            ControllerState::Listening => self.stop_listening().await,
        }
    }

    /// Ask the recognizer to start. The transition to Listening happens on
    /// the `Started` callback, not here.
    async fn start_listening(&mut self) {
        if self.state() != ControllerState::Idle {
            debug!(target: "session", state = %self.state(), "start_listening ignored");
            return;
        }

        match self.recognizer.request_permission().await {
            Ok(true) => {}
            Ok(false) => {
                self.surface_error(SessionError::PermissionDenied);
                return;
            }
            Err(e) => {
                self.surface_error(SessionError::from_recognizer_message(&e.to_string()));
                return;
            }
        }

        if let Err(e) = self.recognizer.start(&self.config.recognizer).await {
            // A refused start participates in the same retry machine as an
            // asynchronous error callback.
            self.handle_error(&e.to_string()).await;
            return;
        }

        debug!(target: "session", "Recognizer start requested, awaiting Started callback");
    }

    async fn stop_listening(&mut self) {
        if self.state() != ControllerState::Listening {
            return;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.recognizer.stop().await {
            warn!(target: "session", "Recognizer stop failed: {}", e);
        }
        self.cache.stop_all().await;
        self.tracker.reset();
        self.arbiter.clear();
        self.session_started_at = None;
        self.set_state(ControllerState::Idle);
    }

    async fn manual_retry(&mut self) {
        if self.state() == ControllerState::Disabled {
            warn!(target: "session", "Manual retry ignored while disabled");
            return;
        }
        info!(target: "session", "Manual retry: resetting retry counter");
        self.retry = RetryState::default();
        *self.current_error.write() = None;
        self.start_listening().await;
    }

    fn set_story(&mut self, story_id: String, personalized: bool) {
        if self.config.story_id == story_id && self.config.personalized == personalized {
            return;
        }
        info!(target: "session", story_id = %story_id, personalized, "Active story changed");
        self.config.story_id = story_id;
        self.config.personalized = personalized;
        self.loader.invalidate();
    }

    async fn auto_retry(&mut self, scheduled_generation: u64) {
        if scheduled_generation != self.generation.load(Ordering::SeqCst) {
            debug!(target: "session", "Dropping stale auto-retry timer");
            return;
        }
        if self.state() != ControllerState::Idle || !self.retry.has_retriable_error {
            debug!(target: "session", state = %self.state(), "Auto-retry no longer applicable");
            return;
        }
        info!(
            target: "session",
            attempt = self.retry.auto_retry_count,
            "Auto-retry: restarting recognition"
        );
        self.start_listening().await;
    }

    fn handle_started(&mut self) {
        if self.state() == ControllerState::Disabled {
            debug!(target: "session", "Ignoring Started callback while disabled");
            return;
        }
        // New session: stale pipeline work and pending retry timers die here.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.retry = RetryState::default();
        self.tracker.reset();
        self.arbiter.clear();
        self.session_started_at = Some(self.clock.now());

        // A transient error banner from the retry loop clears itself once
        // listening actually works again.
        {
            let mut error = self.current_error.write();
            if matches!(*error, Some(SessionError::Transient(_))) {
                *error = None;
            }
        }

        self.set_state(ControllerState::Listening);
    }

    fn handle_ended(&mut self) {
        self.tracker.reset();
        if let Some(started) = self.session_started_at.take() {
            let duration = self.clock.now().duration_since(started);
            debug!(
                target: "session",
                duration_ms = duration.as_millis() as u64,
                "Recognition session ended"
            );
        }
        if self.state() == ControllerState::Listening {
            self.set_state(ControllerState::Idle);
        }
    }

    async fn handle_error(&mut self, message: &str) {
        if self.state() == ControllerState::Disabled {
            debug!(target: "session", "Ignoring recognizer error while disabled: {}", message);
            return;
        }

        warn!(target: "session", "Recognizer error: {}", message);
        self.tracker.reset();
        self.session_started_at = None;
        if self.state() == ControllerState::Listening {
            self.set_state(ControllerState::Idle);
        }

        let error = SessionError::from_recognizer_message(message);
        match error.retry_strategy() {
            RetryStrategy::AutoRetry { .. } => {
                self.retry.auto_retry_count += 1;
                if self.retry.auto_retry_count < self.config.max_auto_retries {
                    self.schedule_retry(message);
                } else {
                    self.retry.has_retriable_error = false;
                    self.surface_error(SessionError::RetriesExhausted {
                        attempts: self.retry.auto_retry_count,
                        message: message.to_string(),
                    });
                }
            }
            RetryStrategy::Surface => {
                self.retry.has_retriable_error = false;
                self.surface_error(error);
            }
        }
    }

    fn schedule_retry(&mut self, message: &str) {
        self.retry.has_retriable_error = true;
        let attempt = self.retry.auto_retry_count;
        let max = self.config.max_auto_retries;

        // Silent retry, except for the error text updating the attempt count.
        *self.current_error.write() = Some(SessionError::Transient(format!(
            "{message} (attempt {attempt}/{max})"
        )));

        PipelineMetrics::incr(&self.metrics.retries_scheduled);
        let delay = Duration::from_millis(self.config.retry_delay_ms);
        let generation = self.generation.load(Ordering::SeqCst);
        let commands_tx = self.commands_tx.clone();

        info!(target: "session", attempt, ?delay, "Scheduling auto-retry");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands_tx.send(Command::AutoRetry { generation }).await;
        });
    }

    async fn handle_result(&mut self, hypotheses: Vec<Hypothesis>) {
        if self.state() != ControllerState::Listening {
            debug!(target: "session", "Ignoring result outside a live session");
            return;
        }
        PipelineMetrics::incr(&self.metrics.hypotheses_in);

        let Some(best) = hypotheses
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        else {
            return;
        };

        debug!(
            target: "session",
            text = %redact_text(&best.text, self.config.redact_logs),
            confidence = best.confidence,
            "Hypothesis"
        );

        let new_content = self.tracker.ingest(&best.text);
        if new_content.is_empty() {
            return;
        }
        let tokens = extract_tokens(&new_content);
        if tokens.is_empty() {
            return;
        }
        PipelineMetrics::add(&self.metrics.words_extracted, tokens.len() as u64);

        let generation = self.generation.load(Ordering::SeqCst);
        let vocab = self
            .loader
            .load(&self.config.story_id, self.config.personalized)
            .await;
        if !self.is_live(generation) {
            debug!(target: "session", "Session ended during vocabulary load, dropping result");
            return;
        }

        for word in match_tokens(&tokens, &vocab) {
            PipelineMetrics::incr(&self.metrics.words_matched);

            if !self.arbiter.check_and_record(&word) {
                PipelineMetrics::incr(&self.metrics.suppressed_repeats);
                continue;
            }

            let mut sound_played = false;
            if let Some(url) = self.cache.resolve(&word, &vocab).map(str::to_string) {
                // The fetch is the slow part; re-check liveness between it
                // and the audible effect, and again before notifying.
                if self.cache.prepare(&url).await {
                    if !self.is_live(generation) {
                        debug!(target: "session", "Session ended during sound fetch, aborting");
                        return;
                    }
                    sound_played = self.cache.play(&url, self.config.volume).await;
                    if !self.is_live(generation) {
                        debug!(target: "session", "Session ended during playback, dropping trigger");
                        return;
                    }
                }
                if sound_played {
                    PipelineMetrics::incr(&self.metrics.sounds_played);
                } else {
                    PipelineMetrics::incr(&self.metrics.playback_failures);
                }
            }

            info!(target: "session", word = %word, sound_played, "Word triggered");
            let _ = self.triggers_tx.send(TriggeredWord { word, sound_played });
        }
    }

    fn is_live(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
            && self.state() == ControllerState::Listening
    }

    fn surface_error(&mut self, error: SessionError) {
        info!(target: "session", "Surfacing session error: {}", error);
        PipelineMetrics::incr(&self.metrics.session_errors);
        *self.current_error.write() = Some(error);
    }

    fn set_state(&self, new_state: ControllerState) {
        let mut state = self.state.write();
        if *state == new_state {
            return;
        }
        info!(target: "session", "State transition: {} -> {}", *state, new_state);
        *state = new_state;
        let _ = self.state_tx.send(new_state);
    }
}

/// Privacy-first logging of child speech: hash instead of raw words.
fn redact_text(text: &str, redact: bool) -> String {
    if redact {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();
        format!("len={} hash={:08x}", text.len(), hash & 0xFFFF_FFFF)
    } else {
        text.to_string()
    }
}
