//! Gamestate event log and announcement de-duplication
//!
//! Events arrive as arbitrary JSON via `POST /gamestate`, are appended to a
//! newline-delimited log file, and are later announced by the
//! [`watcher::AnnouncementWatcher`]. The log is append-only: insertion order
//! is the authoritative ordering for "new since last check" queries.

pub mod watcher;

pub use watcher::AnnouncementWatcher;

use std::collections::{HashSet, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Error, Result};

/// Announced-key window size; oldest keys are evicted FIFO past this
pub const SEEN_WINDOW: usize = 1000;

/// Winner details on a victory event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub name: String,
    pub reason: String,
}

/// A single gamestate event, immutable once appended
#[derive(Debug, Clone)]
pub struct GamestateEvent {
    /// Preferred de-duplication key
    pub event_id: Option<String>,
    /// Fallback de-duplication key / event kind
    pub event: Option<String>,
    /// Subject of an elimination event
    pub who: Option<String>,
    /// Present on victory events
    pub winner: Option<Winner>,
    /// The payload exactly as received
    pub raw: Value,
    pub received_at: DateTime<Utc>,
}

impl GamestateEvent {
    /// Extract recognized fields from a raw JSON object
    #[must_use]
    pub fn from_raw(raw: Value) -> Self {
        let str_field = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        let winner = raw.get("winner").and_then(|w| {
            Some(Winner {
                name: w.get("name")?.as_str()?.to_string(),
                reason: w
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        });

        Self {
            event_id: str_field("event_id"),
            event: str_field("event"),
            who: str_field("who"),
            winner,
            raw,
            received_at: Utc::now(),
        }
    }

    /// De-duplication key: `event_id` if present, else `event`
    ///
    /// Events with neither are unannounceable and stay in the log only.
    #[must_use]
    pub fn dedup_key(&self) -> Option<&str> {
        self.event_id.as_deref().or(self.event.as_deref())
    }
}

/// A line spoken for a gamestate event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// The de-duplication key that produced this announcement
    pub key: String,
    /// The templated line handed to synthesis
    pub text: String,
}

/// Build the announcement line for an event
///
/// A present `winner` classifies the event as a victory; otherwise it is an
/// elimination (or a generic update when no subject is named).
#[must_use]
pub fn announcement_text(event: &GamestateEvent) -> String {
    if let Some(winner) = &event.winner {
        if winner.reason.is_empty() {
            format!("Victory! {} takes the crown.", winner.name)
        } else {
            format!("Victory! {} takes the crown — {}.", winner.name, winner.reason)
        }
    } else if let Some(who) = &event.who {
        format!("{who} has been eliminated.")
    } else {
        let kind = event.event.as_deref().unwrap_or("update");
        format!("Gamestate update: {kind}.")
    }
}

/// Append-only gamestate log
///
/// One writer (the ingest endpoint), any number of readers. Each append goes
/// to both the in-memory sequence and the NDJSON file; readers work off the
/// in-memory sequence through a cursor.
#[derive(Clone)]
pub struct GamestateLog {
    inner: Arc<LogInner>,
}

struct LogInner {
    path: PathBuf,
    events: RwLock<Vec<GamestateEvent>>,
    file: Mutex<File>,
}

impl GamestateLog {
    /// Open (or create) the log at `path`, loading any existing events
    ///
    /// Unparseable lines in an existing file are skipped with a warning
    /// rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or opened for append.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut events = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(&line) {
                    Ok(raw) if raw.is_object() => events.push(GamestateEvent::from_raw(raw)),
                    Ok(_) | Err(_) => {
                        tracing::warn!(path = %path.display(), "skipping unparseable log line");
                    }
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        tracing::debug!(
            path = %path.display(),
            existing = events.len(),
            "gamestate log opened"
        );

        Ok(Self {
            inner: Arc::new(LogInner {
                path: path.to_path_buf(),
                events: RwLock::new(events),
                file: Mutex::new(file),
            }),
        })
    }

    /// Append one raw JSON object to the log
    ///
    /// # Errors
    ///
    /// Returns `Error::Ingest` when the payload is not a JSON object, or an
    /// IO error when the file write fails.
    pub fn append(&self, raw: Value) -> Result<GamestateEvent> {
        if !raw.is_object() {
            return Err(Error::Ingest("gamestate payload must be a JSON object".to_string()));
        }

        let event = GamestateEvent::from_raw(raw);

        {
            let mut file = self
                .inner
                .file
                .lock()
                .map_err(|_| Error::Ingest("gamestate log writer poisoned".to_string()))?;
            serde_json::to_writer(&mut *file, &event.raw)?;
            file.write_all(b"\n")?;
            file.flush()?;
        }

        if let Ok(mut events) = self.inner.events.write() {
            events.push(event.clone());
        }

        Ok(event)
    }

    /// Number of events in the log
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.events.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the log holds no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events appended at or after `cursor`, in insertion order
    #[must_use]
    pub fn events_since(&self, cursor: usize) -> Vec<GamestateEvent> {
        self.inner
            .events
            .read()
            .map(|events| events.get(cursor..).unwrap_or_default().to_vec())
            .unwrap_or_default()
    }

    /// Path of the backing NDJSON file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

/// Bounded FIFO set of already-announced de-duplication keys
///
/// Purely a recent-window guard against re-announcement; eviction is FIFO by
/// arrival, not access.
#[derive(Debug)]
pub struct SeenEvents {
    order: VecDeque<String>,
    keys: HashSet<String>,
    capacity: usize,
}

impl Default for SeenEvents {
    fn default() -> Self {
        Self::with_capacity(SEEN_WINDOW)
    }
}

impl SeenEvents {
    /// Create a window holding at most `capacity` keys
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            keys: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record `key`; returns `false` if it was already in the window
    pub fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }

        self.order.push_back(key.to_string());
        self.keys.insert(key.to_string());
        true
    }

    /// Whether `key` is currently in the window
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of keys currently tracked
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
