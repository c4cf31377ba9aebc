//! Top-level application flow
//!
//! Sequences the stages surrounding a quiz session: credential entry,
//! topic selection, the session itself, and the results view. The flow
//! owns the credential for the whole application lifetime and is the
//! only component that reads or writes the credential store; sessions
//! receive the credential by reference when their fetches are issued.

use std::fmt::Write;

use web_time::SystemTime;

use crate::constants::credential;
use crate::content::QuizContent;
use crate::narration::Narrator;
use crate::screen::Screen;
use crate::session::{ContentRequest, FlowSignal, Phase, Session};
use crate::topic::Topic;

/// Persistent storage for the service credential
///
/// Keys are opaque to the flow; it always uses
/// [`credential::STORAGE_KEY`]. Implementations may back this with
/// browser local storage, a keyring, or plain memory.
pub trait CredentialStore {
    /// Reads the value stored under `key`, if any
    fn load(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value
    fn save(&mut self, key: &str, value: &str);

    /// Removes the value stored under `key`
    ///
    /// Must be safe to call when nothing is stored.
    fn remove(&mut self, key: &str);
}

/// An in-memory credential store
///
/// Holds at most one value per key for the process lifetime. Used for
/// embeddings without persistent storage and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// The record of a finished quiz session
///
/// Kept by the flow until the next restart; the content is retained in
/// full so a transcript can be produced on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    /// The topic that was played
    pub topic: Topic,
    /// The final score
    pub score: u32,
    /// The full content of the session
    pub content: QuizContent,
    /// When the session finished
    pub finished_at: SystemTime,
}

impl CompletedSession {
    /// Renders the session as a plain-text transcript
    ///
    /// Includes the topic, the final score, and every question with its
    /// options, correct answer, and explanation, in play order.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Topic: {}", self.topic.name());
        let _ = writeln!(
            out,
            "Score: {}/{}",
            self.score,
            self.content.total_questions()
        );

        for (index, question) in self.content.questions().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}. {}", index + 1, question.prompt);
            for option in &question.options {
                let marker = if *option == question.correct_answer {
                    '*'
                } else {
                    '-'
                };
                let _ = writeln!(out, "   {marker} {option}");
            }
            let _ = writeln!(out, "   Answer: {}", question.correct_answer);
            let _ = writeln!(out, "   {}", question.explanation);
        }

        out
    }
}

/// The flow's externally visible stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for the player to enter a credential
    CredentialEntry,
    /// Waiting for the player to pick a topic
    TopicSelection,
    /// A quiz session is in progress
    Quiz,
    /// The most recent session's results are shown
    Results,
}

enum FlowState<N: Narrator> {
    CredentialEntry,
    TopicSelection,
    Quiz(Session<N>),
    Results(CompletedSession),
}

/// The application flow controller
///
/// Generic over the credential store and over the narrator handed to
/// each session it starts.
pub struct Flow<N: Narrator, C: CredentialStore> {
    store: C,
    credential: Option<String>,
    state: FlowState<N>,
}

impl<N: Narrator, C: CredentialStore> Flow<N, C> {
    /// Starts the flow, loading any stored credential
    ///
    /// With a stored credential the flow opens at topic selection;
    /// otherwise at credential entry.
    pub fn start(store: C) -> Self {
        let credential = store.load(credential::STORAGE_KEY);
        let state = if credential.is_some() {
            tracing::debug!("stored credential found; skipping credential entry");
            FlowState::TopicSelection
        } else {
            FlowState::CredentialEntry
        };
        Self {
            store,
            credential,
            state,
        }
    }

    /// The current stage
    pub fn stage(&self) -> Stage {
        match &self.state {
            FlowState::CredentialEntry => Stage::CredentialEntry,
            FlowState::TopicSelection => Stage::TopicSelection,
            FlowState::Quiz(_) => Stage::Quiz,
            FlowState::Results(_) => Stage::Results,
        }
    }

    /// The held credential, passed to fetchers by the embedder
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Accepts a credential entered by the player
    ///
    /// A blank value is rejected and the flow stays at credential entry.
    /// An accepted value is persisted and the flow moves to topic
    /// selection. Returns whether the value was accepted. Ignored outside
    /// credential entry.
    pub fn submit_credential(&mut self, value: &str) -> bool {
        if !matches!(self.state, FlowState::CredentialEntry) {
            return false;
        }
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.store.save(credential::STORAGE_KEY, trimmed);
        self.credential = Some(trimmed.to_string());
        self.state = FlowState::TopicSelection;
        true
    }

    /// Starts a session for the selected topic
    ///
    /// Only valid at topic selection with a credential held; returns the
    /// content fetch the new session needs, or `None` when ignored.
    pub fn select_topic<S: Screen>(
        &mut self,
        topic: Topic,
        narrator: N,
        screen: &S,
    ) -> Option<ContentRequest> {
        if !matches!(self.state, FlowState::TopicSelection) || self.credential.is_none() {
            return None;
        }
        let (session, request) = Session::begin(topic, narrator, screen);
        self.state = FlowState::Quiz(session);
        Some(request)
    }

    /// The running session, if any
    pub fn session(&self) -> Option<&Session<N>> {
        match &self.state {
            FlowState::Quiz(session) => Some(session),
            _ => None,
        }
    }

    /// The running session, if any, for forwarding player and embedder
    /// events
    pub fn session_mut(&mut self) -> Option<&mut Session<N>> {
        match &mut self.state {
            FlowState::Quiz(session) => Some(session),
            _ => None,
        }
    }

    /// Applies a signal raised by the session
    ///
    /// Credential discard removes the stored value and returns the flow
    /// to credential entry; the session is released.
    pub fn handle_signal(&mut self, signal: FlowSignal) {
        match signal {
            FlowSignal::DiscardCredential => {
                tracing::warn!("credential rejected by the service; forcing re-entry");
                self.store.remove(credential::STORAGE_KEY);
                self.credential = None;
                if let FlowState::Quiz(session) = &mut self.state {
                    session.abort();
                }
                self.state = FlowState::CredentialEntry;
            }
        }
    }

    /// Moves a finished session to the results stage
    ///
    /// Ignored unless the running session has actually finished.
    pub fn session_finished(&mut self) {
        let FlowState::Quiz(session) = &self.state else {
            return;
        };
        if session.phase() != Phase::Finished {
            return;
        }
        let FlowState::Quiz(session) = std::mem::replace(&mut self.state, FlowState::TopicSelection)
        else {
            return;
        };
        match session.into_completed() {
            Some(completed) => self.state = FlowState::Results(completed),
            None => self.state = FlowState::TopicSelection,
        }
    }

    /// The most recent results, while they are shown
    pub fn completed(&self) -> Option<&CompletedSession> {
        match &self.state {
            FlowState::Results(completed) => Some(completed),
            _ => None,
        }
    }

    /// Returns to topic selection, discarding the current stage
    ///
    /// Aborts a running session (releasing its clock and narration) and
    /// drops any shown results. Falls back to credential entry when no
    /// credential is held.
    pub fn restart(&mut self) {
        if let FlowState::Quiz(session) = &mut self.state {
            session.abort();
        }
        self.state = if self.credential.is_some() {
            FlowState::TopicSelection
        } else {
            FlowState::CredentialEntry
        };
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::constants::quiz;
    use crate::content::Question;
    use crate::fetch::FetchError;
    use crate::narration::Muted;

    #[derive(Default)]
    struct NullScreen {
        shown: RefCell<usize>,
    }

    impl Screen for NullScreen {
        fn show(&self, _message: &crate::UpdateMessage) {
            *self.shown.borrow_mut() += 1;
        }

        fn sync(&self, _state: &crate::SyncMessage) {}
    }

    fn sample_question(tag: usize) -> Question {
        Question {
            prompt: format!("Question {tag}"),
            options: vec![
                format!("Right {tag}"),
                "Wrong A".to_string(),
                "Wrong B".to_string(),
                "Wrong C".to_string(),
            ],
            correct_answer: format!("Right {tag}"),
            explanation: format!("Explanation {tag}"),
            image_prompt: format!("Image prompt {tag}"),
        }
    }

    fn sample_content() -> QuizContent {
        QuizContent::from_flat(
            (0..quiz::TOTAL_QUESTIONS_PER_TOPIC)
                .map(sample_question)
                .collect(),
        )
        .unwrap()
    }

    fn stored(value: &str) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.save(credential::STORAGE_KEY, value);
        store
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load(credential::STORAGE_KEY), None);

        store.save(credential::STORAGE_KEY, "first");
        store.save(credential::STORAGE_KEY, "second");
        assert_eq!(
            store.load(credential::STORAGE_KEY),
            Some("second".to_string())
        );

        store.remove(credential::STORAGE_KEY);
        store.remove(credential::STORAGE_KEY);
        assert_eq!(store.load(credential::STORAGE_KEY), None);
    }

    #[test]
    fn test_startup_without_credential_asks_for_one() {
        let flow: Flow<Muted, _> = Flow::start(MemoryStore::new());
        assert_eq!(flow.stage(), Stage::CredentialEntry);
        assert_eq!(flow.credential(), None);
    }

    #[test]
    fn test_startup_with_stored_credential_skips_entry() {
        let flow: Flow<Muted, _> = Flow::start(stored("stored-key"));
        assert_eq!(flow.stage(), Stage::TopicSelection);
        assert_eq!(flow.credential(), Some("stored-key"));
    }

    #[test]
    fn test_blank_credential_rejected() {
        let mut flow: Flow<Muted, _> = Flow::start(MemoryStore::new());
        assert!(!flow.submit_credential("   "));
        assert_eq!(flow.stage(), Stage::CredentialEntry);
    }

    #[test]
    fn test_submitted_credential_persisted_and_trimmed() {
        let mut flow: Flow<Muted, _> = Flow::start(MemoryStore::new());
        assert!(flow.submit_credential("  entered-key  "));
        assert_eq!(flow.stage(), Stage::TopicSelection);
        assert_eq!(flow.credential(), Some("entered-key"));
        assert_eq!(
            flow.store.load(credential::STORAGE_KEY),
            Some("entered-key".to_string())
        );
    }

    #[test]
    fn test_topic_selection_requires_credential() {
        let screen = NullScreen::default();
        let mut flow: Flow<Muted, _> = Flow::start(MemoryStore::new());
        assert_eq!(
            flow.select_topic(Topic::History, Muted, &screen),
            None
        );
    }

    #[test]
    fn test_full_run_reaches_results_with_transcript() {
        let screen = NullScreen::default();
        let mut flow = Flow::start(stored("key"));

        let request = flow
            .select_topic(Topic::Geography, Muted, &screen)
            .unwrap();
        assert_eq!(request.topic, Topic::Geography);
        assert_eq!(flow.stage(), Stage::Quiz);

        let session = flow.session_mut().unwrap();
        session.content_ready(Ok(sample_content()), &screen, |_, _| {}, |_| {});
        for _ in 0..quiz::TOTAL_QUESTIONS_PER_TOPIC {
            session.select_answer(0, &screen);
            session.advance(&screen, |_, _| {}, |_| {});
        }

        flow.session_finished();
        assert_eq!(flow.stage(), Stage::Results);

        let completed = flow.completed().unwrap();
        assert_eq!(completed.topic, Topic::Geography);
        assert_eq!(completed.score, quiz::TOTAL_QUESTIONS_PER_TOPIC as u32);

        let transcript = completed.transcript();
        assert!(transcript.contains("Topic: World Geography"));
        assert!(transcript.contains("Score: 10/10"));
        assert!(transcript.contains("1. Question 0"));
        assert!(transcript.contains("10. Question 9"));
        assert!(transcript.contains("* Right 3"));
        assert!(transcript.contains("Answer: Right 3"));
        assert!(transcript.contains("Explanation 9"));
    }

    #[test]
    fn test_session_finished_ignored_while_running() {
        let screen = NullScreen::default();
        let mut flow = Flow::start(stored("key"));
        flow.select_topic(Topic::Zoology, Muted, &screen);
        flow.session_mut()
            .unwrap()
            .content_ready(Ok(sample_content()), &screen, |_, _| {}, |_| {});

        flow.session_finished();
        assert_eq!(flow.stage(), Stage::Quiz);
    }

    #[test]
    fn test_credential_discard_returns_to_entry() {
        let screen = NullScreen::default();
        let mut flow = Flow::start(stored("rejected-key"));
        flow.select_topic(Topic::History, Muted, &screen);

        let signal = flow
            .session_mut()
            .unwrap()
            .content_ready(
                Err(FetchError::InvalidCredential),
                &screen,
                |_, _| {},
                |_| {},
            )
            .unwrap();
        flow.handle_signal(signal);

        assert_eq!(flow.stage(), Stage::CredentialEntry);
        assert_eq!(flow.credential(), None);
        assert_eq!(flow.store.load(credential::STORAGE_KEY), None);
    }

    #[test]
    fn test_restart_discards_results_and_keeps_credential() {
        let screen = NullScreen::default();
        let mut flow = Flow::start(stored("key"));
        flow.select_topic(Topic::Sports, Muted, &screen);
        let session = flow.session_mut().unwrap();
        session.content_ready(Ok(sample_content()), &screen, |_, _| {}, |_| {});
        for _ in 0..quiz::TOTAL_QUESTIONS_PER_TOPIC {
            session.select_answer(1, &screen);
            session.advance(&screen, |_, _| {}, |_| {});
        }
        flow.session_finished();
        assert!(flow.completed().is_some());

        flow.restart();
        assert_eq!(flow.stage(), Stage::TopicSelection);
        assert_eq!(flow.completed(), None);
        assert_eq!(flow.credential(), Some("key"));
    }

    #[test]
    fn test_restart_mid_session_aborts_it() {
        let screen = NullScreen::default();
        let mut flow = Flow::start(stored("key"));
        flow.select_topic(Topic::Biodiversity, Muted, &screen);
        flow.session_mut()
            .unwrap()
            .content_ready(Ok(sample_content()), &screen, |_, _| {}, |_| {});

        flow.restart();
        assert_eq!(flow.stage(), Stage::TopicSelection);
        assert!(flow.session().is_none());
    }
}
