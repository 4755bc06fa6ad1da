//! Voice processing: push-to-talk capture, transcription, synthesis, playback

mod capture;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use playback::{CpalPlayer, Player, write_fallback_artifact};
pub use stt::{Transcriber, WhisperApi};
pub use tts::{ElevenLabs, OpenAiTts, Synthesizer};
