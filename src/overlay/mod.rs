//! Overlay state document and its server
//!
//! The overlay is a browser-rendered speech bubble captured by OBS/Streamlabs.
//! [`OverlayStore`] owns the single mutable state document; the pipeline
//! writes through it and the HTTP server reads from it.

pub mod server;

pub use server::OverlayServer;

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bubble rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Speech bubble with the reply text
    Speak,
    /// Thinking indicator while a turn is in flight
    Think,
}

/// The overlay state document
///
/// `text` is never null; the idle state is an empty string with
/// `visible = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayState {
    pub text: String,
    pub mode: OverlayMode,
    pub visible: bool,
    pub font_size: u32,
    /// Last-write timestamp, surfaced as `ts` for the overlay page
    #[serde(rename = "ts")]
    pub updated_at: DateTime<Utc>,
}

impl OverlayState {
    fn idle(font_size: u32) -> Self {
        Self {
            text: String::new(),
            mode: OverlayMode::Speak,
            visible: false,
            font_size,
            updated_at: Utc::now(),
        }
    }
}

/// Handle to the shared overlay state
///
/// Last-writer-wins; all mutation goes through the three setters below so
/// concurrent writers serialize on one lock and never leave the document in
/// a partially updated state.
#[derive(Clone)]
pub struct OverlayStore {
    state: Arc<RwLock<OverlayState>>,
    font_size: u32,
}

impl OverlayStore {
    /// Create a store in the idle state
    #[must_use]
    pub fn new(font_size: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(OverlayState::idle(font_size))),
            font_size,
        }
    }

    /// Show the thinking indicator
    pub fn set_thinking(&self) {
        self.write(OverlayMode::Think, "...".to_string(), true);
    }

    /// Show a speech bubble with `text`
    pub fn set_speaking(&self, text: &str) {
        self.write(OverlayMode::Speak, text.to_string(), true);
    }

    /// Return to the idle (hidden) state
    pub fn clear(&self) {
        self.write(OverlayMode::Speak, String::new(), false);
    }

    /// Read a copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> OverlayState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|_| OverlayState::idle(self.font_size))
    }

    fn write(&self, mode: OverlayMode, text: String, visible: bool) {
        if let Ok(mut state) = self.state.write() {
            state.mode = mode;
            state.text = text;
            state.visible = visible;
            state.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_starts_idle() {
        let store = OverlayStore::new(30);
        let state = store.snapshot();
        assert!(!state.visible);
        assert!(state.text.is_empty());
        assert_eq!(state.font_size, 30);
    }

    #[test]
    fn thinking_then_speaking_then_clear() {
        let store = OverlayStore::new(30);

        store.set_thinking();
        let state = store.snapshot();
        assert_eq!(state.mode, OverlayMode::Think);
        assert!(state.visible);

        store.set_speaking("The abyss answers.");
        let state = store.snapshot();
        assert_eq!(state.mode, OverlayMode::Speak);
        assert_eq!(state.text, "The abyss answers.");
        assert!(state.visible);

        store.clear();
        let state = store.snapshot();
        assert!(!state.visible);
        assert!(state.text.is_empty());
    }

    #[test]
    fn state_serializes_with_ts_field() {
        let store = OverlayStore::new(24);
        store.set_speaking("hello");
        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(json["mode"], "speak");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["visible"], true);
        assert_eq!(json["font_size"], 24);
        assert!(json["ts"].is_string());
    }
}
