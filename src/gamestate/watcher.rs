//! Announcement watcher: polls the gamestate log and feeds the pipeline
//!
//! A single poll loop walks the log from a cursor, de-duplicates against the
//! bounded seen-window, and submits one trigger per new event. Only one poll
//! is ever in flight, and events are announced strictly in log-append order;
//! serialization with the voice pipeline happens in the orchestrator queue.

use std::time::Duration;

use tokio::sync::mpsc;

use super::{Announcement, GamestateLog, SeenEvents, announcement_text};
use crate::pipeline::Trigger;

/// Polls [`GamestateLog`] for new events and submits announcement triggers
pub struct AnnouncementWatcher {
    log: GamestateLog,
    seen: SeenEvents,
    cursor: usize,
    triggers: mpsc::Sender<Trigger>,
    interval: Duration,
}

impl AnnouncementWatcher {
    /// Create a watcher starting at the current end of the log
    ///
    /// Events already in the log at startup are never announced; only events
    /// appended afterwards are.
    #[must_use]
    pub fn new(log: GamestateLog, triggers: mpsc::Sender<Trigger>, interval: Duration) -> Self {
        let cursor = log.len();
        Self {
            log,
            seen: SeenEvents::default(),
            cursor,
            triggers,
            interval,
        }
    }

    /// Create a watcher that replays the log from the beginning (tests)
    #[must_use]
    pub fn from_start(log: GamestateLog, triggers: mpsc::Sender<Trigger>, interval: Duration) -> Self {
        Self {
            cursor: 0,
            ..Self::new(log, triggers, interval)
        }
    }

    /// Run the poll loop until the trigger channel closes
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        // Skip the immediate first tick so startup events settle
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if self.poll_once().await.is_err() {
                tracing::debug!("trigger channel closed, stopping announcement watcher");
                break;
            }
        }
    }

    /// Examine new log entries once, submitting a trigger per announceable event
    ///
    /// Returns the number of announcements submitted.
    ///
    /// # Errors
    ///
    /// Returns an error only when the orchestrator side of the trigger
    /// channel has gone away.
    pub async fn poll_once(&mut self) -> Result<usize, mpsc::error::SendError<Trigger>> {
        let new_events = self.log.events_since(self.cursor);
        self.cursor += new_events.len();

        let mut announced = 0;
        for event in new_events {
            let Some(key) = event.dedup_key() else {
                tracing::info!("gamestate event has no event_id or event field, not announcing");
                continue;
            };
            let key = key.to_string();

            if !self.seen.insert(&key) {
                tracing::debug!(key = %key, "duplicate gamestate event, skipping");
                continue;
            }

            let text = announcement_text(&event);
            tracing::info!(key = %key, text = %text, "announcing gamestate event");

            self.triggers
                .send(Trigger::Gamestate(Announcement { key, text }))
                .await?;
            announced += 1;
        }

        Ok(announced)
    }

    /// Current read offset into the log
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
