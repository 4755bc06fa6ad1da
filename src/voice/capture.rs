//! Push-to-talk audio capture from the microphone
//!
//! The capture stream accumulates f32 samples into a shared buffer between
//! `start` and `stop`; the orchestrator takes the buffer when the hotkey is
//! released and encodes it to WAV for transcription.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for capture (16kHz mono, what speech APIs expect)
pub const SAMPLE_RATE: u32 = 16000;

/// Records from the default input device while the hotkey is held
pub struct AudioCapture {
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new capture instance
    ///
    /// # Errors
    ///
    /// Returns `Error::Capture` if no input device is available or no mono
    /// 16kHz configuration is supported.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Capture("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Capture(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Capture("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start recording into the buffer
    ///
    /// # Errors
    ///
    /// Returns `Error::Capture` if the input stream cannot be opened.
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Capture("no input device".to_string()))?;

        let config = self.config.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Capture(e.to_string()))?;

        stream.play().map_err(|e| Error::Capture(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("recording started");
        Ok(())
    }

    /// Stop recording; the buffer keeps what was captured
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("recording stopped");
        }
    }

    /// Take the captured samples, leaving the buffer empty
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Copy the captured samples without clearing (level metering)
    #[must_use]
    pub fn peek_buffer(&self) -> Vec<f32> {
        self.buffer.lock().map(|buf| buf.clone()).unwrap_or_default()
    }

    /// Discard any captured samples
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Seconds of audio currently buffered
    #[must_use]
    pub fn buffered_secs(&self) -> f32 {
        let len = self.buffer.lock().map(|b| b.len()).unwrap_or(0);
        len as f32 / SAMPLE_RATE as f32
    }

    /// Whether a recording stream is open
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.stream.is_some()
    }
}

/// Encode f32 samples as 16-bit mono WAV bytes for the STT API
///
/// # Errors
///
/// Returns `Error::Capture` if WAV encoding fails.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Capture(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Capture(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Capture(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_produces_riff_header() {
        let samples: Vec<f32> = (0..1600)
            .map(|i| (i as f32 / 100.0).sin() * 0.5)
            .collect();
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.len() > 44);
    }

    #[test]
    fn wav_samples_survive_the_trip() {
        let original = vec![0.0_f32, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&original, SAMPLE_RATE).unwrap();

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.samples::<i16>().count(), original.len());
    }
}
