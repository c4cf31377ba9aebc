//! # Trivia Generation Library
//!
//! This library provides the core logic for an AI-generated trivia quiz.
//! It handles topic selection, on-demand generation of questions and
//! per-question illustrations through a remote generation service, the
//! timed question/reveal/explanation cycle of a quiz session, and the
//! surrounding application flow from credential entry to the results
//! transcript.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod constants;

pub mod clock;
pub mod content;
pub mod fetch;
pub mod flow;
pub mod narration;
pub mod screen;
pub mod session;
pub mod topic;

/// Full-state messages used to render the current view from scratch
///
/// This enum wraps the state snapshots of every component that announces
/// them, so a single channel can carry them to the host UI.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Quiz session state snapshots
    Session(session::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages announcing incremental changes to the current view
///
/// Update messages notify the host UI about changes such as clock ticks,
/// revealed answers, or resolved illustrations.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Quiz session updates
    Session(session::UpdateMessage),
}

/// Alarm messages for timed events
///
/// Alarms are scheduled by the engine with a delay and delivered back by
/// the embedder when the delay elapses.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Quiz session alarms
    Session(session::AlarmMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
