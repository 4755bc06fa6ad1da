//! Gamestate log and announcement watcher integration tests

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use leviathan_cohost::pipeline::Trigger;
use leviathan_cohost::{AnnouncementWatcher, GamestateLog};

mod common;
use common::temp_log;

const INTERVAL: Duration = Duration::from_millis(50);

fn watcher_with_channel(
    log: GamestateLog,
) -> (AnnouncementWatcher, mpsc::Receiver<Trigger>) {
    let (tx, rx) = mpsc::channel(16);
    (AnnouncementWatcher::from_start(log, tx, INTERVAL), rx)
}

fn drain(rx: &mut mpsc::Receiver<Trigger>) -> Vec<Trigger> {
    let mut out = Vec::new();
    while let Ok(trigger) = rx.try_recv() {
        out.push(trigger);
    }
    out
}

#[tokio::test]
async fn duplicate_event_ids_announce_once() {
    let (_dir, log) = temp_log();
    let (mut watcher, mut rx) = watcher_with_channel(log.clone());

    log.append(json!({"event_id": "kill_42", "event": "elimination", "who": "PlayerX"}))
        .unwrap();
    log.append(json!({"event_id": "kill_42", "event": "elimination", "who": "PlayerX"}))
        .unwrap();

    let announced = watcher.poll_once().await.unwrap();
    assert_eq!(announced, 1);

    let triggers = drain(&mut rx);
    assert_eq!(triggers.len(), 1);
    let Trigger::Gamestate(announcement) = &triggers[0] else {
        panic!("expected a gamestate trigger");
    };
    assert_eq!(announcement.key, "kill_42");
    assert!(announcement.text.contains("PlayerX"));
}

#[tokio::test]
async fn duplicates_across_polls_are_skipped() {
    let (_dir, log) = temp_log();
    let (mut watcher, mut rx) = watcher_with_channel(log.clone());

    log.append(json!({"event_id": "e1"})).unwrap();
    assert_eq!(watcher.poll_once().await.unwrap(), 1);

    log.append(json!({"event_id": "e1"})).unwrap();
    assert_eq!(watcher.poll_once().await.unwrap(), 0);

    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn keyless_events_are_logged_but_never_announced() {
    let (_dir, log) = temp_log();
    let (mut watcher, mut rx) = watcher_with_channel(log.clone());

    log.append(json!({"who": "PlayerZ", "detail": "no identifiers here"}))
        .unwrap();

    assert_eq!(watcher.poll_once().await.unwrap(), 0);
    assert!(drain(&mut rx).is_empty());

    // Still appended: the log is the record, announcements are best-effort
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn events_announce_in_append_order() {
    let (_dir, log) = temp_log();
    let (mut watcher, mut rx) = watcher_with_channel(log.clone());

    log.append(json!({"event_id": "a", "who": "One"})).unwrap();
    log.append(json!({"event_id": "b", "who": "Two"})).unwrap();
    log.append(json!({"event_id": "c", "who": "Three"})).unwrap();

    assert_eq!(watcher.poll_once().await.unwrap(), 3);

    let keys: Vec<String> = drain(&mut rx)
        .into_iter()
        .map(|t| match t {
            Trigger::Gamestate(a) => a.key,
            other => panic!("unexpected trigger {other:?}"),
        })
        .collect();
    assert_eq!(keys, ["a", "b", "c"]);
}

#[tokio::test]
async fn dedup_falls_back_to_event_field() {
    let (_dir, log) = temp_log();
    let (mut watcher, mut rx) = watcher_with_channel(log.clone());

    log.append(json!({"event": "round_start"})).unwrap();
    log.append(json!({"event": "round_start"})).unwrap();

    assert_eq!(watcher.poll_once().await.unwrap(), 1);
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn victory_events_use_the_winner_template() {
    let (_dir, log) = temp_log();
    let (mut watcher, mut rx) = watcher_with_channel(log.clone());

    log.append(json!({
        "event_id": "match_end",
        "winner": {"name": "PlayerY", "reason": "last squad standing"},
    }))
    .unwrap();

    assert_eq!(watcher.poll_once().await.unwrap(), 1);

    let triggers = drain(&mut rx);
    let Trigger::Gamestate(announcement) = &triggers[0] else {
        panic!("expected a gamestate trigger");
    };
    assert!(announcement.text.contains("Victory"));
    assert!(announcement.text.contains("PlayerY"));
    assert!(announcement.text.contains("last squad standing"));
}

#[tokio::test]
async fn watcher_starts_at_the_end_of_an_existing_log() {
    let (_dir, log) = temp_log();
    log.append(json!({"event_id": "old_news"})).unwrap();

    // Default construction skips history; only fresh appends announce
    let (tx, mut rx) = mpsc::channel(16);
    let mut watcher = AnnouncementWatcher::new(log.clone(), tx, INTERVAL);

    assert_eq!(watcher.poll_once().await.unwrap(), 0);

    log.append(json!({"event_id": "fresh"})).unwrap();
    assert_eq!(watcher.poll_once().await.unwrap(), 1);

    let triggers = drain(&mut rx);
    let Trigger::Gamestate(announcement) = &triggers[0] else {
        panic!("expected a gamestate trigger");
    };
    assert_eq!(announcement.key, "fresh");
}

#[tokio::test]
async fn cursor_advances_past_consumed_events() {
    let (_dir, log) = temp_log();
    let (mut watcher, _rx) = watcher_with_channel(log.clone());

    log.append(json!({"event_id": "e1"})).unwrap();
    log.append(json!({"event_id": "e2"})).unwrap();
    watcher.poll_once().await.unwrap();
    assert_eq!(watcher.cursor(), 2);

    log.append(json!({"event_id": "e3"})).unwrap();
    watcher.poll_once().await.unwrap();
    assert_eq!(watcher.cursor(), 3);
}
