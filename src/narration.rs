//! Narration capability for reading explanations aloud
//!
//! The host environment owns a single process-wide speech output; the
//! session controller holds it as a capability object for the session's
//! duration and cancels it on every state exit path, so no utterance
//! outlives the state that started it.

/// A capability that speaks text aloud
///
/// At most one utterance is active at a time; starting a new one replaces
/// any in progress.
pub trait Narrator {
    /// Begins speaking the given text, replacing any active utterance
    fn start(&mut self, text: &str);

    /// Cancels the active utterance, if any
    ///
    /// Must be safe to call when nothing is being spoken.
    fn cancel(&mut self);
}

/// A narrator that stays silent
///
/// Used by embedders without speech output and by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Muted;

impl Narrator for Muted {
    fn start(&mut self, _text: &str) {}

    fn cancel(&mut self) {}
}
