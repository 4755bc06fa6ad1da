//! Deterministic persona quips: the no-network reply of last resort
//!
//! The same input always produces the same line, so a turn that loses its
//! LLM backend still completes with a predictable utterance.

const OPENERS: [&str; 4] = [
    "We are Code Leviathan.",
    "The abyss answers (with a grin).",
    "Leviathan stirs; keep up.",
    "Your code tides shift; so does our mood.",
];

const TONES: [&str; 3] = [
    "Brief, with bite.",
    "Pointed, a smirk implied.",
    "Dry humor only; no flattery.",
];

/// Build the persona reply for `text`
///
/// Opener and tone are selected by a byte-sum of the input, so repeated calls
/// with the same request yield the same line.
#[must_use]
pub fn persona_reply(text: &str, context: Option<&str>) -> String {
    let text = if text.trim().is_empty() {
        "Speak, mortal."
    } else {
        text.trim()
    };

    let hash: usize = text.bytes().map(usize::from).sum();
    let opener = OPENERS[hash % OPENERS.len()];
    let tone = TONES[hash % TONES.len()];

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{opener} {text} Context: {ctx}. {tone}"),
        _ => format!("{opener} {text} {tone}"),
    }
}
