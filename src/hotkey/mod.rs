//! Global push-to-talk hotkey listener
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events. rdev has no
//! graceful shutdown API; the thread stays parked in the OS event loop
//! until the process exits, which holds no resources needing cleanup.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc;

use crate::{Error, Result};

/// Discrete push-to-talk events emitted by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    Pressed,
    Released,
}

/// Map a config string to an `rdev::Key`
///
/// Accepts the common modifier names plus function keys and single
/// characters ("ctrl", "f9", "space", "z", ...).
///
/// # Errors
///
/// Returns `Error::Config` for unrecognized key names.
pub fn parse_key(name: &str) -> Result<rdev::Key> {
    use rdev::Key;

    let key = match name.to_ascii_lowercase().as_str() {
        "ctrl" | "control" | "leftctrl" => Key::ControlLeft,
        "rightctrl" => Key::ControlRight,
        "alt" => Key::Alt,
        "shift" => Key::ShiftLeft,
        "space" => Key::Space,
        "tab" => Key::Tab,
        "capslock" => Key::CapsLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        single if single.len() == 1 => match single.chars().next() {
            Some(c @ 'a'..='z') => char_key(c),
            _ => {
                return Err(Error::Config(format!("unsupported hotkey {name:?}")));
            }
        },
        _ => {
            return Err(Error::Config(format!("unsupported hotkey {name:?}")));
        }
    };

    Ok(key)
}

fn char_key(c: char) -> rdev::Key {
    use rdev::Key;
    match c {
        'a' => Key::KeyA,
        'b' => Key::KeyB,
        'c' => Key::KeyC,
        'd' => Key::KeyD,
        'e' => Key::KeyE,
        'f' => Key::KeyF,
        'g' => Key::KeyG,
        'h' => Key::KeyH,
        'i' => Key::KeyI,
        'j' => Key::KeyJ,
        'k' => Key::KeyK,
        'l' => Key::KeyL,
        'm' => Key::KeyM,
        'n' => Key::KeyN,
        'o' => Key::KeyO,
        'p' => Key::KeyP,
        'q' => Key::KeyQ,
        'r' => Key::KeyR,
        's' => Key::KeyS,
        't' => Key::KeyT,
        'u' => Key::KeyU,
        'v' => Key::KeyV,
        'w' => Key::KeyW,
        'x' => Key::KeyX,
        'y' => Key::KeyY,
        _ => Key::KeyZ,
    }
}

/// Handle to a running hotkey listener thread
///
/// Construct with [`HotkeyListener::start`]; drop to stop forwarding events.
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the OS thread that watches `key` and forwards press/release
    /// events on `tx`
    ///
    /// Repeat `KeyPress` events while the key is held (OS auto-repeat) are
    /// collapsed so each physical hold produces exactly one
    /// `Pressed`/`Released` pair.
    #[must_use]
    pub fn start(key: rdev::Key, tx: mpsc::Sender<HotkeyEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut held = false;
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }

                    match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key && !held => {
                            held = true;
                            let _ = tx.blocking_send(HotkeyEvent::Pressed);
                        }
                        rdev::EventType::KeyRelease(k) if k == key => {
                            held = false;
                            let _ = tx.blocking_send(HotkeyEvent::Released);
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    tracing::error!("hotkey listener exited: {e:?}");
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_accepts_common_names() {
        assert_eq!(parse_key("ctrl").unwrap(), rdev::Key::ControlLeft);
        assert_eq!(parse_key("Control").unwrap(), rdev::Key::ControlLeft);
        assert_eq!(parse_key("F9").unwrap(), rdev::Key::F9);
        assert_eq!(parse_key("space").unwrap(), rdev::Key::Space);
        assert_eq!(parse_key("z").unwrap(), rdev::Key::KeyZ);
    }

    #[test]
    fn parse_key_rejects_unknown_names() {
        assert!(parse_key("hyper").is_err());
        assert!(parse_key("7").is_err());
    }
}
