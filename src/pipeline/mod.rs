//! Pipeline orchestration
//!
//! One [`TurnRunner`] executes a complete turn: trigger in, overlay updates
//! and at most one playback out. Turns are serialized through a single
//! `mpsc` consumer, which is what guarantees the audio device and overlay
//! state have one owner at a time; there is no lock to get wrong.
//!
//! Busy policy: gamestate and direct-text triggers queue in arrival order;
//! a push-to-talk press that lands while a turn is in flight is dropped
//! with a log line, never queued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::brain::ReplyEngine;
use crate::context::{self, ContextProvider};
use crate::gamestate::Announcement;
use crate::hotkey::HotkeyEvent;
use crate::overlay::OverlayStore;
use crate::voice::{
    AudioCapture, Player, SAMPLE_RATE, Synthesizer, Transcriber, samples_to_wav,
    write_fallback_artifact,
};
use crate::{Error, Result};

/// Queue depth for pending triggers
pub const TRIGGER_QUEUE_DEPTH: usize = 32;

/// How long the bubble lingers after playback before clearing
const DEFAULT_LINGER: Duration = Duration::from_secs(1);

/// What starts a turn
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Captured push-to-talk audio (WAV bytes)
    PushToTalk(Vec<u8>),
    /// Operator-typed text, bypassing capture and transcription
    DirectText(String),
    /// A templated gamestate announcement, bypassing the brain
    Gamestate(Announcement),
}

/// Runs one turn at a time against the shared overlay and audio output
pub struct TurnRunner {
    overlay: OverlayStore,
    brain: Arc<dyn ReplyEngine>,
    player: Arc<dyn Player>,
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    context_providers: Vec<Box<dyn ContextProvider>>,
    stage_timeout: Duration,
    streaming: bool,
    linger: Duration,
}

impl TurnRunner {
    /// Create a runner with the mandatory stages
    #[must_use]
    pub fn new(
        overlay: OverlayStore,
        brain: Arc<dyn ReplyEngine>,
        player: Arc<dyn Player>,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            overlay,
            brain,
            player,
            transcriber: None,
            synthesizer: None,
            context_providers: Vec::new(),
            stage_timeout,
            streaming: false,
            linger: DEFAULT_LINGER,
        }
    }

    /// Attach a transcription engine (required for push-to-talk triggers)
    #[must_use]
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Attach a synthesis engine; without one the runner is overlay-only
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Attach context providers consulted before each reply
    #[must_use]
    pub fn with_context_providers(mut self, providers: Vec<Box<dyn ContextProvider>>) -> Self {
        self.context_providers = providers;
        self
    }

    /// Use the vendor's streaming synthesis endpoint
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Override the post-playback bubble linger (tests set this to zero)
    #[must_use]
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Execute one turn for `trigger`
    ///
    /// On any error the overlay is restored to idle before returning; the
    /// caller logs and carries on; per-turn failures never take down the
    /// pipeline.
    ///
    /// # Errors
    ///
    /// Returns the failing stage's error after restoring the overlay.
    pub async fn run_turn(&self, trigger: Trigger) -> Result<()> {
        let result = self.dispatch(trigger).await;
        if result.is_err() {
            self.overlay.clear();
        }
        result
    }

    /// Consume triggers until the channel closes, one turn at a time
    pub async fn serve(&self, mut triggers: mpsc::Receiver<Trigger>) {
        while let Some(trigger) = triggers.recv().await {
            if let Err(e) = self.run_turn(trigger).await {
                tracing::error!(error = %e, "turn aborted");
            }
        }
    }

    async fn dispatch(&self, trigger: Trigger) -> Result<()> {
        match trigger {
            Trigger::PushToTalk(audio) => {
                let transcriber = self.transcriber.as_ref().ok_or_else(|| {
                    Error::Capture("push-to-talk requires a transcription engine".to_string())
                })?;

                self.overlay.set_thinking();
                let transcript = self
                    .stage("transcription", transcriber.transcribe(&audio))
                    .await?;
                let transcript = transcript.trim().to_string();

                if transcript.is_empty() {
                    tracing::info!("heard nothing recognizable");
                    self.overlay.clear();
                    return Ok(());
                }

                tracing::info!(transcript = %transcript, "operator said");
                self.reply_and_speak(&transcript).await
            }
            Trigger::DirectText(text) => {
                self.overlay.set_thinking();
                self.reply_and_speak(&text).await
            }
            // Announcements carry their line already; no think phase
            Trigger::Gamestate(announcement) => self.speak(&announcement.text).await,
        }
    }

    async fn reply_and_speak(&self, text: &str) -> Result<()> {
        let context = context::gather(&self.context_providers);
        let reply = self
            .stage("reply", self.brain.reply(text, context.as_deref()))
            .await?;

        tracing::info!(reply = %reply, "co-host will say");
        self.speak(&reply).await
    }

    /// Show `text` on the overlay, synthesize and play it, then go idle
    ///
    /// A synthesis or playback failure still leaves the text visible for the
    /// linger window; the reply is never silently dropped.
    async fn speak(&self, text: &str) -> Result<()> {
        self.overlay.set_speaking(text);

        let result = self.synthesize_and_play(text).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "speech failed; overlay still shows the reply");
        }

        tokio::time::sleep(self.linger).await;
        self.overlay.clear();
        result
    }

    async fn synthesize_and_play(&self, text: &str) -> Result<()> {
        let Some(synthesizer) = &self.synthesizer else {
            tracing::info!("speech output disabled, overlay only");
            return Ok(());
        };

        let audio = if self.streaming {
            self.stage("synthesis", synthesizer.synthesize_streaming(text))
                .await?
        } else {
            self.stage("synthesis", synthesizer.synthesize(text)).await?
        };

        if audio.is_empty() {
            return Ok(());
        }

        match self.stage("playback", self.player.play(&audio)).await {
            Ok(()) => Ok(()),
            Err(play_err) => {
                // Salvage the audio so the operator can play it manually
                let path = write_fallback_artifact(&audio)?;
                tracing::warn!(
                    error = %play_err,
                    path = %path.display(),
                    "playback failed; audio saved for manual playback"
                );
                Ok(())
            }
        }
    }

    /// Bound a stage call by the configured timeout
    async fn stage<T>(
        &self,
        name: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.stage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::StageTimeout(name)),
        }
    }
}

/// Run the interactive push-to-talk loop until Ctrl+C
///
/// Owns the capture device on the calling task (cpal streams are not
/// `Send`). Queued triggers and hotkey events are multiplexed here; because
/// this loop is the only trigger consumer, turns cannot overlap.
///
/// # Errors
///
/// Returns capture device errors from starting a recording; per-turn errors
/// are logged and swallowed.
pub async fn run_interactive(
    runner: &TurnRunner,
    mut triggers: mpsc::Receiver<Trigger>,
    mut hotkeys: mpsc::Receiver<HotkeyEvent>,
    mut capture: AudioCapture,
    max_record: Duration,
) -> Result<()> {
    tracing::info!("push-to-talk ready: hold the hotkey to record, Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            Some(trigger) = triggers.recv() => {
                if let Err(e) = runner.run_turn(trigger).await {
                    tracing::error!(error = %e, "turn aborted");
                }
                discard_stale_hotkeys(&mut hotkeys);
            }
            Some(event) = hotkeys.recv() => {
                if event == HotkeyEvent::Pressed {
                    match record_window(&mut capture, &mut hotkeys, max_record).await {
                        Ok(audio) if audio.is_empty() => {
                            tracing::info!("no audio captured");
                        }
                        Ok(audio) => {
                            if let Err(e) = runner.run_turn(Trigger::PushToTalk(audio)).await {
                                tracing::error!(error = %e, "turn aborted");
                            }
                            discard_stale_hotkeys(&mut hotkeys);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "capture failed, pipeline stays up");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Record until the hotkey is released or the window elapses
async fn record_window(
    capture: &mut AudioCapture,
    hotkeys: &mut mpsc::Receiver<HotkeyEvent>,
    max_record: Duration,
) -> Result<Vec<u8>> {
    capture.clear_buffer();
    capture.start()?;
    tracing::info!("recording...");

    let deadline = tokio::time::sleep(max_record);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = hotkeys.recv() => match event {
                Some(HotkeyEvent::Released) | None => break,
                Some(HotkeyEvent::Pressed) => {}
            },
            () = &mut deadline => {
                tracing::info!("max recording window reached, stopping");
                break;
            }
        }
    }

    capture.stop();
    let samples = capture.take_buffer();
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    tracing::debug!(secs = samples.len() as f32 / SAMPLE_RATE as f32, "captured audio");
    samples_to_wav(&samples, SAMPLE_RATE)
}

/// Drop hotkey events that piled up while a turn was speaking
fn discard_stale_hotkeys(hotkeys: &mut mpsc::Receiver<HotkeyEvent>) {
    while let Ok(event) = hotkeys.try_recv() {
        if event == HotkeyEvent::Pressed {
            tracing::info!("push-to-talk pressed while busy, dropped");
        }
    }
}
