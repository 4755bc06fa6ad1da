//! Audio playback to the default output device
//!
//! Synthesized speech arrives as MP3 bytes; playback decodes with minimp3 and
//! drives a blocking cpal stream on the blocking thread pool. When the device
//! fails the audio is written to a temp artifact and its path reported, so a
//! reply is never silently dropped.

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate most TTS vendors emit
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays one reply's audio; the pipeline guarantees calls never overlap
#[async_trait]
pub trait Player: Send + Sync {
    /// Decode and play MP3 bytes, returning when playback finishes
    async fn play(&self, mp3: &[u8]) -> Result<()>;
}

/// cpal-backed player for the default output device
pub struct CpalPlayer {
    /// Volume multiplier, clamped to 0.0 - 2.0
    volume: f32,
}

impl CpalPlayer {
    /// Create a player with the given volume (`None` means unity gain)
    #[must_use]
    pub fn new(volume: Option<f32>) -> Self {
        Self {
            volume: normalize_volume(volume),
        }
    }

    /// Play raw f32 samples directly (diagnostics)
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if the output device fails.
    pub async fn play_raw(&self, samples: Vec<f32>) -> Result<()> {
        tokio::task::spawn_blocking(move || play_samples_blocking(&samples))
            .await
            .map_err(|e| Error::Playback(format!("playback task failed: {e}")))?
    }
}

#[async_trait]
impl Player for CpalPlayer {
    async fn play(&self, mp3: &[u8]) -> Result<()> {
        if mp3.is_empty() {
            tracing::warn!("no audio data to play");
            return Ok(());
        }

        let mut samples = decode_mp3(mp3)?;
        if (self.volume - 1.0).abs() > f32::EPSILON {
            for sample in &mut samples {
                *sample = (*sample * self.volume).clamp(-1.0, 1.0);
            }
        }

        // The cpal stream is !Send, so the whole device lifecycle lives
        // inside one blocking task.
        tokio::task::spawn_blocking(move || play_samples_blocking(&samples))
            .await
            .map_err(|e| Error::Playback(format!("playback task failed: {e}")))?
    }
}

/// Open the default output device and play `samples` to completion
fn play_samples_blocking(samples: &[f32]) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| {
            c.channels() <= 2
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Playback("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    let queue = Arc::new(Mutex::new((samples.to_vec(), 0usize)));
    let finished = Arc::new(Mutex::new(false));

    let queue_cb = Arc::clone(&queue);
    let finished_cb = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut guard) = queue_cb.lock() else { return };
                let (samples, pos) = &mut *guard;

                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples.len() {
                        let s = samples[*pos];
                        *pos += 1;
                        s
                    } else {
                        if let Ok(mut done) = finished_cb.lock() {
                            *done = true;
                        }
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    // Poll until the callback drains the queue, bounded by the audio length
    let duration_ms = (samples.len() as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(duration_ms + 500);

    while !finished.lock().map(|d| *d).unwrap_or(true) {
        if std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    // Let the device flush its tail
    std::thread::sleep(std::time::Duration::from_millis(100));
    drop(stream);

    tracing::debug!(samples = samples.len(), "playback complete");
    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        (left + right) / 2.0
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

/// Clamp a requested volume to 0.0 - 2.0
fn normalize_volume(volume: Option<f32>) -> f32 {
    match volume {
        None => 1.0,
        Some(v) if v < 0.0 => {
            tracing::warn!(volume = v, "volume below 0, clamping to 0");
            0.0
        }
        Some(v) if v > 2.0 => {
            tracing::warn!(volume = v, "volume above 2.0, clamping to 2.0");
            2.0
        }
        Some(v) => v,
    }
}

/// Write undeliverable audio to a temp artifact and return its path
///
/// Used when the output device fails mid-turn: the operator can play the
/// file manually, and the reply text stays on the overlay.
///
/// # Errors
///
/// Returns an IO error if the temp file cannot be written.
pub fn write_fallback_artifact(mp3: &[u8]) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("leviathan-reply-")
        .suffix(".mp3")
        .tempfile()?;
    file.write_all(mp3)?;
    let (_, path) = file.keep().map_err(|e| Error::Playback(e.to_string()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_clamped() {
        assert_eq!(normalize_volume(None), 1.0);
        assert_eq!(normalize_volume(Some(-0.5)), 0.0);
        assert_eq!(normalize_volume(Some(5.0)), 2.0);
        assert_eq!(normalize_volume(Some(0.8)), 0.8);
    }

    #[test]
    fn fallback_artifact_is_written_and_kept() {
        let path = write_fallback_artifact(b"not really mp3").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"not really mp3");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn garbage_bytes_fail_decode() {
        // minimp3 skips junk until EOF; zero frames means zero samples
        let samples = decode_mp3(&[0u8; 64]).unwrap();
        assert!(samples.is_empty());
    }
}
