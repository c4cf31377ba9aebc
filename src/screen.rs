//! Display boundary between the quiz engine and the host UI
//!
//! This module defines the trait through which the session controller
//! announces view changes. The abstraction keeps the engine independent
//! of the component tree rendering it; implementations might drive a web
//! view, a terminal, or a test recorder.

use super::{SyncMessage, UpdateMessage};

/// Trait for presenting engine messages to the player
pub trait Screen {
    /// Presents an update message
    ///
    /// Update messages describe incremental changes to the current view,
    /// such as a clock tick or a resolved illustration.
    fn show(&self, message: &UpdateMessage);

    /// Presents a full state snapshot
    ///
    /// Sync messages carry everything needed to render the current view
    /// from scratch, typically for the initial paint of a phase.
    fn sync(&self, state: &SyncMessage);
}
