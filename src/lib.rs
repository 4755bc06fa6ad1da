//! Leviathan Co-Host: a voice co-host gateway for live streams
//!
//! Push-to-talk audio in, synthesized speech and a browser overlay out,
//! plus an auxiliary channel that watches a gamestate event log and
//! announces eliminations and victories.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Hotkey │ /gamestate POST │ --say                │
//! └──────────────────┬───────────────────────────────┘
//!                    │ triggers (one consumer)
//! ┌──────────────────▼───────────────────────────────┐
//! │            Pipeline Orchestrator                  │
//! │  capture → STT → brain → TTS → playback          │
//! └────────┬─────────────────────────────┬───────────┘
//!          │ overlay writes              │ announce polls
//! ┌────────▼──────────┐       ┌──────────▼───────────┐
//! │  Overlay server   │       │  Gamestate log        │
//! │  GET / /state     │       │  + watcher            │
//! └───────────────────┘       └──────────────────────┘
//! ```

pub mod brain;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod gamestate;
pub mod hotkey;
pub mod overlay;
pub mod pipeline;
pub mod voice;

pub use brain::{Brain, ReplyEngine, persona_reply};
pub use config::{BrainProvider, Config};
pub use error::{Error, Result};
pub use gamestate::{
    Announcement, AnnouncementWatcher, GamestateEvent, GamestateLog, SeenEvents,
};
pub use overlay::{OverlayMode, OverlayServer, OverlayState, OverlayStore};
pub use pipeline::{Trigger, TurnRunner};
