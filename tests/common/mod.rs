//! Shared test utilities and adapter doubles
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use leviathan_cohost::brain::ReplyEngine;
use leviathan_cohost::voice::{Player, Synthesizer, Transcriber};
use leviathan_cohost::{Error, GamestateLog, OverlayState, OverlayStore, Result};

/// Open a gamestate log in a fresh temp directory
pub fn temp_log() -> (tempfile::TempDir, GamestateLog) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let log = GamestateLog::open(&dir.path().join("gamestate.ndjson")).expect("failed to open log");
    (dir, log)
}

/// Transcriber returning a fixed transcript
pub struct FixedTranscriber(pub String);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Transcriber that always fails
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Err(Error::Stt("engine unavailable".to_string()))
    }
}

/// Brain returning a fixed reply, optionally recording the overlay state it saw
pub struct FixedBrain {
    pub reply: String,
    pub seen: Arc<Mutex<Vec<OverlayState>>>,
    overlay: Option<OverlayStore>,
}

impl FixedBrain {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
            overlay: None,
        }
    }

    /// Snapshot `overlay` on every call so tests can assert the think phase
    pub fn watching(reply: &str, overlay: OverlayStore) -> Self {
        Self {
            overlay: Some(overlay),
            ..Self::new(reply)
        }
    }
}

#[async_trait]
impl ReplyEngine for FixedBrain {
    async fn reply(&self, _text: &str, _context: Option<&str>) -> Result<String> {
        if let Some(overlay) = &self.overlay {
            self.seen.lock().unwrap().push(overlay.snapshot());
        }
        Ok(self.reply.clone())
    }
}

/// Brain that sleeps before answering (timeout tests)
pub struct SlowBrain(pub Duration);

#[async_trait]
impl ReplyEngine for SlowBrain {
    async fn reply(&self, _text: &str, _context: Option<&str>) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

/// Synthesizer returning fixed bytes, optionally recording the overlay state it saw
pub struct StubSynth {
    pub seen: Arc<Mutex<Vec<OverlayState>>>,
    overlay: Option<OverlayStore>,
}

impl StubSynth {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            overlay: None,
        }
    }

    /// Snapshot `overlay` on every call so tests can assert the speak phase
    pub fn watching(overlay: OverlayStore) -> Self {
        Self {
            overlay: Some(overlay),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Synthesizer for StubSynth {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if let Some(overlay) = &self.overlay {
            self.seen.lock().unwrap().push(overlay.snapshot());
        }
        Ok(format!("mp3:{text}").into_bytes())
    }
}

/// Synthesizer that always fails
pub struct FailingSynth;

#[async_trait]
impl Synthesizer for FailingSynth {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Err(Error::Tts("vendor down".to_string()))
    }
}

/// Player recording each playback's start/end instants
pub struct RecordingPlayer {
    pub plays: Arc<Mutex<Vec<(Instant, Instant)>>>,
    pub delay: Duration,
}

impl RecordingPlayer {
    pub fn new(delay: Duration) -> Self {
        Self {
            plays: Arc::new(Mutex::new(Vec::new())),
            delay,
        }
    }

    pub fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }
}

#[async_trait]
impl Player for RecordingPlayer {
    async fn play(&self, _mp3: &[u8]) -> Result<()> {
        let start = Instant::now();
        tokio::time::sleep(self.delay).await;
        self.plays.lock().unwrap().push((start, Instant::now()));
        Ok(())
    }
}

/// Player that always fails (artifact fallback tests)
pub struct FailingPlayer;

#[async_trait]
impl Player for FailingPlayer {
    async fn play(&self, _mp3: &[u8]) -> Result<()> {
        Err(Error::Playback("device gone".to_string()))
    }
}
