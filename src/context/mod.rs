//! Optional context injection for reply generation
//!
//! Context providers are pluggable and best-effort: a provider that fails
//! returns `None` and logs, never aborting a turn. Window-title capture is
//! another provider behind the same seam, left to platform integrations.

use arboard::Clipboard;

/// Supplies an optional context string for one reply attempt
pub trait ContextProvider: Send + Sync {
    /// Fetch the current context, or `None` when nothing useful is available
    fn context(&self) -> Option<String>;
}

/// Fixed context string from the `--context` flag
pub struct StaticContext(pub String);

impl ContextProvider for StaticContext {
    fn context(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// Current clipboard text
///
/// Opens a short-lived `arboard::Clipboard` handle per call; the handle is
/// cheap to create and not `Send` on all platforms, so sharing one is not
/// worth it.
pub struct ClipboardContext;

impl ContextProvider for ClipboardContext {
    fn context(&self) -> Option<String> {
        let mut clipboard = match Clipboard::new() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "clipboard unavailable");
                return None;
            }
        };

        // get_text errs on empty or non-text clipboards; both mean "nothing"
        clipboard
            .get_text()
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|t| format!("clipboard: {t}"))
    }
}

/// Join all providers' context into one string
#[must_use]
pub fn gather(providers: &[Box<dyn ContextProvider>]) -> Option<String> {
    let parts: Vec<String> = providers.iter().filter_map(|p| p.context()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
