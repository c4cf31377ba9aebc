//! Quiz session controller
//!
//! This module contains the state machine driving a single quiz
//! playthrough, from the first fetched question to the final score. It
//! coordinates the per-question countdown with answer submission and the
//! delayed reveal phase, and it degrades gracefully when the best-effort
//! illustration call fails.
//!
//! The controller is sans-IO. View changes are announced through a
//! [`Screen`]. Timed transitions are requested through a
//! `schedule_alarm` closure and arrive back as [`AlarmMessage`]s;
//! illustration fetches are requested through a closure and resolved by
//! the embedder calling [`Session::illustration_resolved`]. Stale
//! illustration resolutions are discarded by comparing a monotonic
//! token, not by relying on delivery order.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use web_time::SystemTime;

use crate::clock::{Clock, Tick, TickCue};
use crate::constants::{clock, quiz};
use crate::content::{Position, Question, QuizContent};
use crate::fetch::{FetchError, Illustration};
use crate::flow::CompletedSession;
use crate::narration::Narrator;
use crate::screen::Screen;
use crate::topic::Topic;

/// How a question was resolved
///
/// Recorded transiently per question; only correct selections outlive it,
/// as a score increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerOutcome {
    /// Time expired before any option was selected
    Unanswered,
    /// The player selected an option
    Selected {
        /// Index of the selected option
        index: usize,
        /// Whether the selection was the correct option
        correct: bool,
    },
}

impl AnswerOutcome {
    /// Whether this outcome increments the score
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Selected { correct: true, .. })
    }
}

/// The display-only slot holding the current question's illustration
///
/// Updated by illustration resolutions and never consulted for scoring
/// or transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImageSlot {
    /// The illustration request is still in flight
    Pending,
    /// The illustration arrived and is ready for inline display
    Ready {
        /// The image encoded as a `data:` URL
        data_url: String,
    },
    /// The illustration request failed; the quiz continues regardless
    Failed {
        /// Whether the failure was quota exhaustion, which gets a
        /// distinct "limit reached" affordance
        quota_exhausted: bool,
        /// User-facing failure description
        message: String,
    },
}

/// Alarm messages for the session's timed transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Drives the countdown clock one interval forward
    ClockTick {
        /// Position the tick was scheduled for; stale ticks are inert
        position: Position,
    },
    /// Ends the grace window that keeps the correct option highlighted
    /// after time expires
    RevealElapsed {
        /// Position the reveal was scheduled for; stale reveals are inert
        position: Position,
    },
}

/// Update messages announced to the screen as the session progresses
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize)]
pub enum UpdateMessage {
    /// Content is being generated for the selected topic
    Loading {
        /// The topic being played
        topic: Topic,
    },
    /// A question became current
    QuestionAnnouncement {
        /// 1-based number of the question
        ordinal: usize,
        /// Total number of questions in the session
        total: usize,
        /// The question text
        prompt: String,
        /// The answer options in display order
        options: Vec<String>,
        /// Score entering this question
        score: u32,
        /// Time available to answer
        #[serde_as(as = "serde_with::DurationSeconds<u64>")]
        duration: Duration,
    },
    /// The countdown advanced one interval
    ClockTick {
        /// Time left to answer
        #[serde_as(as = "serde_with::DurationSeconds<u64>")]
        remaining: Duration,
    },
    /// Time expired; the correct option is highlighted during the grace
    /// window
    CorrectReveal {
        /// Index of the correct option
        correct_index: usize,
    },
    /// The question resolved and its explanation is shown
    Explanation {
        /// How the question was resolved
        outcome: AnswerOutcome,
        /// Index of the correct option
        correct_index: usize,
        /// The explanation text
        explanation: String,
        /// Current state of the illustration slot
        image: ImageSlot,
        /// Score after this question
        score: u32,
    },
    /// The current question's illustration arrived
    IllustrationReady {
        /// The image encoded as a `data:` URL
        data_url: String,
    },
    /// The current question's illustration failed; display-only
    IllustrationFailed {
        /// Whether the failure was quota exhaustion
        quota_exhausted: bool,
        /// User-facing failure description
        message: String,
    },
    /// The session completed
    Finished {
        /// Final score
        score: u32,
        /// Total number of questions presented
        total: usize,
    },
    /// Content generation failed; only restarting remains
    Error {
        /// User-facing failure description
        message: String,
    },
}

/// Full state snapshots for rendering the current view from scratch
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub enum SyncMessage {
    /// Content is being generated
    Loading {
        /// The topic being played
        topic: Topic,
    },
    /// A question is current
    Question {
        /// 1-based number of the question
        ordinal: usize,
        /// Total number of questions in the session
        total: usize,
        /// The question text
        prompt: String,
        /// The answer options in display order
        options: Vec<String>,
        /// Current score
        score: u32,
        /// Time left to answer
        #[serde_as(as = "serde_with::DurationSeconds<u64>")]
        remaining: Duration,
        /// Set during the post-expiry grace window: index of the correct
        /// option being highlighted
        revealed_correct: Option<usize>,
    },
    /// An explanation is shown
    Explanation {
        /// 1-based number of the question
        ordinal: usize,
        /// Total number of questions in the session
        total: usize,
        /// How the question was resolved
        outcome: AnswerOutcome,
        /// Index of the correct option
        correct_index: usize,
        /// The explanation text
        explanation: String,
        /// Current state of the illustration slot
        image: ImageSlot,
        /// Current score
        score: u32,
    },
    /// The session completed
    Finished {
        /// Final score
        score: u32,
        /// Total number of questions presented
        total: usize,
    },
    /// Content generation failed
    Error {
        /// User-facing failure description
        message: String,
    },
}

/// The session's externally visible phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Waiting for content generation
    Loading,
    /// A question is current and the clock is running
    Question,
    /// Time expired; the correct option is highlighted
    Reveal,
    /// The explanation is shown
    Explanation,
    /// The session completed
    Finished,
    /// Content generation failed terminally
    Error,
}

/// Describes the content fetch a freshly started session needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentRequest {
    /// Topic to generate content for
    pub topic: Topic,
}

/// Describes the illustration fetch a newly current question needs
///
/// Issued fresh each time a question becomes current; the token must be
/// echoed back on resolution so stale results can be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllustrationRequest {
    /// The question's image-generation prompt
    pub prompt: String,
    /// Monotonic token identifying the question this request belongs to
    pub token: u64,
    /// Position of the question this request belongs to
    pub position: Position,
}

/// Signals the session raises for the top-level flow controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSignal {
    /// The credential was rejected; discard it and restart at credential
    /// entry
    DiscardCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivePhase {
    Question,
    Reveal,
    Explanation,
}

#[derive(Debug)]
struct Active {
    content: QuizContent,
    position: Position,
    score: u32,
    phase: ActivePhase,
    outcome: Option<AnswerOutcome>,
    clock: Clock,
    image: ImageSlot,
    image_token: u64,
    aborted: bool,
}

impl Active {
    /// The question at the current position
    fn current_question(&self) -> &Question {
        self.content
            .question(self.position)
            .expect("session position stays within content bounds")
    }
}

#[derive(Debug)]
enum State {
    Loading,
    Active(Box<Active>),
    Finished {
        score: u32,
        content: QuizContent,
        finished_at: SystemTime,
    },
    Error {
        message: String,
    },
}

/// One quiz playthrough from topic selection to final score
///
/// Owns the fetched content, the per-question clock, and the narration
/// capability for the session's duration. Narration is cancelled on
/// every state exit path.
pub struct Session<N: Narrator> {
    topic: Topic,
    narrator: N,
    state: State,
    token_counter: u64,
}

impl<N: Narrator> fmt::Debug for Session<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("topic", &self.topic)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl<N: Narrator> Session<N> {
    /// Starts a session for a topic and returns the content fetch it
    /// needs
    ///
    /// The session enters `Loading`; the embedder performs the fetch and
    /// reports back through [`Session::content_ready`].
    pub fn begin<S: Screen>(topic: Topic, narrator: N, screen: &S) -> (Self, ContentRequest) {
        let session = Self {
            topic,
            narrator,
            state: State::Loading,
            token_counter: 0,
        };
        screen.show(&UpdateMessage::Loading { topic }.into());
        (session, ContentRequest { topic })
    }

    /// The topic this session plays
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// The externally visible phase
    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Loading => Phase::Loading,
            State::Active(active) => match active.phase {
                ActivePhase::Question => Phase::Question,
                ActivePhase::Reveal => Phase::Reveal,
                ActivePhase::Explanation => Phase::Explanation,
            },
            State::Finished { .. } => Phase::Finished,
            State::Error { .. } => Phase::Error,
        }
    }

    /// Current score, if content has been loaded
    pub fn score(&self) -> Option<u32> {
        match &self.state {
            State::Active(active) => Some(active.score),
            State::Finished { score, .. } => Some(*score),
            _ => None,
        }
    }

    /// Current position, while the session is active
    pub fn position(&self) -> Option<Position> {
        match &self.state {
            State::Active(active) => Some(active.position),
            _ => None,
        }
    }

    /// Current illustration slot, while the session is active
    pub fn image_slot(&self) -> Option<&ImageSlot> {
        match &self.state {
            State::Active(active) => Some(&active.image),
            _ => None,
        }
    }

    /// Reports the result of the content fetch requested by
    /// [`Session::begin`]
    ///
    /// On success the first question becomes current: its announcement
    /// is shown, the clock tick chain is scheduled, and its illustration
    /// is requested. A credential rejection is not a local error: it
    /// returns [`FlowSignal::DiscardCredential`] so the flow controller
    /// can force re-entry. Any other failure makes the session terminal
    /// with a user-facing message. Ignored unless the session is still
    /// loading.
    pub fn content_ready<S, A, R>(
        &mut self,
        result: Result<QuizContent, FetchError>,
        screen: &S,
        mut schedule_alarm: A,
        mut request_illustration: R,
    ) -> Option<FlowSignal>
    where
        S: Screen,
        A: FnMut(crate::AlarmMessage, Duration),
        R: FnMut(IllustrationRequest),
    {
        if !matches!(self.state, State::Loading) {
            return None;
        }

        match result {
            Ok(content) => {
                self.token_counter += 1;
                let active = Active {
                    content,
                    position: Position::START,
                    score: 0,
                    phase: ActivePhase::Question,
                    outcome: None,
                    clock: Clock::new(),
                    image: ImageSlot::Pending,
                    image_token: self.token_counter,
                    aborted: false,
                };
                Self::announce_question(&active, screen);
                Self::schedule_tick(active.position, &mut schedule_alarm);
                Self::dispatch_illustration(&active, &mut request_illustration);
                self.state = State::Active(Box::new(active));
                None
            }
            Err(error) if error.is_credential_rejection() => Some(FlowSignal::DiscardCredential),
            Err(error) => {
                let message = error.to_string();
                screen.show(
                    &UpdateMessage::Error {
                        message: message.clone(),
                    }
                    .into(),
                );
                self.state = State::Error { message };
                None
            }
        }
    }

    /// Handles the player selecting an answer option
    ///
    /// Exactly one of answer selection and time expiry resolves a
    /// question; whichever occurs first wins and the other becomes a
    /// no-op. A selection is ignored when the question is already
    /// resolved, the index is out of range, or no question is current.
    /// A winning selection records the outcome, increments the score iff
    /// it matched the correct option, pauses the clock, and moves
    /// immediately to the explanation.
    pub fn select_answer<S: Screen>(&mut self, index: usize, screen: &S) {
        let State::Active(active) = &mut self.state else {
            return;
        };
        if active.aborted
            || active.phase != ActivePhase::Question
            || active.outcome.is_some()
            || index >= quiz::OPTION_COUNT
        {
            return;
        }

        let correct = active.current_question().is_correct(index);
        active.outcome = Some(AnswerOutcome::Selected { index, correct });
        if correct {
            active.score += 1;
        }
        active.clock.pause();
        active.phase = ActivePhase::Explanation;
        Self::announce_explanation(active, screen);
    }

    /// Handles a scheduled alarm
    ///
    /// Clock ticks drive the countdown: each running tick re-schedules
    /// the next one; expiry resolves the question as unanswered, reveals
    /// the correct option, and schedules the end of the grace window.
    /// Alarms carrying a position other than the current one are stale
    /// and inert.
    pub fn receive_alarm<S, A, C>(
        &mut self,
        message: &crate::AlarmMessage,
        screen: &S,
        mut schedule_alarm: A,
        cue: &mut C,
    ) where
        S: Screen,
        A: FnMut(crate::AlarmMessage, Duration),
        C: TickCue,
    {
        let crate::AlarmMessage::Session(message) = message;
        let State::Active(active) = &mut self.state else {
            return;
        };
        if active.aborted {
            return;
        }

        match message {
            AlarmMessage::ClockTick { position } => {
                if *position != active.position || active.phase != ActivePhase::Question {
                    return;
                }
                match active.clock.tick(cue) {
                    Tick::Running { remaining } => {
                        screen.show(
                            &UpdateMessage::ClockTick {
                                remaining: Duration::from_secs(remaining),
                            }
                            .into(),
                        );
                        Self::schedule_tick(active.position, &mut schedule_alarm);
                    }
                    Tick::Expired => {
                        if active.outcome.is_none() {
                            active.outcome = Some(AnswerOutcome::Unanswered);
                            active.phase = ActivePhase::Reveal;
                            let correct_index =
                                active.current_question().correct_index().unwrap_or_default();
                            screen.show(&UpdateMessage::CorrectReveal { correct_index }.into());
                            schedule_alarm(
                                AlarmMessage::RevealElapsed {
                                    position: active.position,
                                }
                                .into(),
                                Duration::from_secs(clock::REVEAL_GRACE_SECONDS),
                            );
                        }
                    }
                    Tick::Idle => {}
                }
            }
            AlarmMessage::RevealElapsed { position } => {
                if *position != active.position || active.phase != ActivePhase::Reveal {
                    return;
                }
                active.phase = ActivePhase::Explanation;
                Self::announce_explanation(active, screen);
            }
        }
    }

    /// Reports the resolution of an illustration request
    ///
    /// The resolution is discarded unless its token matches the current
    /// question's token, so a fetch outliving its question can never
    /// overwrite a newer question's display slot. Failures fill the slot
    /// with a placeholder (quota exhaustion distinguished from generic
    /// failure) and never affect scoring or transitions.
    pub fn illustration_resolved<S: Screen>(
        &mut self,
        token: u64,
        result: Result<Illustration, FetchError>,
        screen: &S,
    ) {
        let State::Active(active) = &mut self.state else {
            return;
        };
        if active.aborted || token != active.image_token {
            return;
        }

        match result {
            Ok(illustration) => {
                let data_url = illustration.data_url();
                active.image = ImageSlot::Ready {
                    data_url: data_url.clone(),
                };
                screen.show(&UpdateMessage::IllustrationReady { data_url }.into());
            }
            Err(error) => {
                let quota_exhausted = error.is_quota_exhaustion();
                let message = error.to_string();
                active.image = ImageSlot::Failed {
                    quota_exhausted,
                    message: message.clone(),
                };
                screen.show(
                    &UpdateMessage::IllustrationFailed {
                        quota_exhausted,
                        message,
                    }
                    .into(),
                );
            }
        }
    }

    /// Advances past the current explanation
    ///
    /// Moves to the next question, with the per-question transient state
    /// reset, a fresh clock, and a fresh illustration request. When no
    /// question remains, completes the session instead, carrying the
    /// score and the full content. Cancels any active narration either
    /// way. A no-op outside the explanation phase.
    pub fn advance<S, A, R>(
        &mut self,
        screen: &S,
        mut schedule_alarm: A,
        mut request_illustration: R,
    ) where
        S: Screen,
        A: FnMut(crate::AlarmMessage, Duration),
        R: FnMut(IllustrationRequest),
    {
        let State::Active(active) = &mut self.state else {
            return;
        };
        if active.aborted || active.phase != ActivePhase::Explanation {
            return;
        }
        self.narrator.cancel();

        if let Some(next) = active.position.advanced() {
            active.position = next;
            active.phase = ActivePhase::Question;
            active.outcome = None;
            active.image = ImageSlot::Pending;
            active.clock = Clock::new();
            self.token_counter += 1;
            active.image_token = self.token_counter;
            Self::announce_question(active, screen);
            Self::schedule_tick(active.position, &mut schedule_alarm);
            Self::dispatch_illustration(active, &mut request_illustration);
            return;
        }

        let State::Active(active) = std::mem::replace(&mut self.state, State::Loading) else {
            return;
        };
        let score = active.score;
        screen.show(
            &UpdateMessage::Finished {
                score,
                total: quiz::TOTAL_QUESTIONS_PER_TOPIC,
            }
            .into(),
        );
        self.state = State::Finished {
            score,
            content: active.content,
            finished_at: SystemTime::now(),
        };
    }

    /// Starts narrating the current explanation
    ///
    /// A no-op outside the explanation phase.
    pub fn narrate_explanation(&mut self) {
        let State::Active(active) = &self.state else {
            return;
        };
        if active.aborted || active.phase != ActivePhase::Explanation {
            return;
        }
        let explanation = active.current_question().explanation.clone();
        self.narrator.start(&explanation);
    }

    /// Releases the session's resources on early exit
    ///
    /// Cancels any active narration, pauses the clock, and marks the
    /// session aborted so every later alarm and input is a no-op,
    /// including a grace-window reveal alarm already scheduled. Called
    /// when the player leaves the session before it finishes.
    pub fn abort(&mut self) {
        self.narrator.cancel();
        if let State::Active(active) = &mut self.state {
            active.clock.pause();
            active.aborted = true;
        }
    }

    /// Hands the completed session to the flow controller
    ///
    /// Returns `None` unless the session finished.
    pub fn into_completed(self) -> Option<CompletedSession> {
        match self.state {
            State::Finished {
                score,
                content,
                finished_at,
            } => Some(CompletedSession {
                topic: self.topic,
                score,
                content,
                finished_at,
            }),
            _ => None,
        }
    }

    /// Builds a full snapshot of the current view
    pub fn sync_message(&self) -> SyncMessage {
        match &self.state {
            State::Loading => SyncMessage::Loading { topic: self.topic },
            State::Active(active) => {
                let question = active.current_question();
                match active.phase {
                    ActivePhase::Question | ActivePhase::Reveal => SyncMessage::Question {
                        ordinal: active.position.ordinal(),
                        total: quiz::TOTAL_QUESTIONS_PER_TOPIC,
                        prompt: question.prompt.clone(),
                        options: question.options.clone(),
                        score: active.score,
                        remaining: Duration::from_secs(active.clock.remaining()),
                        revealed_correct: (active.phase == ActivePhase::Reveal)
                            .then(|| question.correct_index().unwrap_or_default()),
                    },
                    ActivePhase::Explanation => SyncMessage::Explanation {
                        ordinal: active.position.ordinal(),
                        total: quiz::TOTAL_QUESTIONS_PER_TOPIC,
                        outcome: active.outcome.unwrap_or(AnswerOutcome::Unanswered),
                        correct_index: question.correct_index().unwrap_or_default(),
                        explanation: question.explanation.clone(),
                        image: active.image.clone(),
                        score: active.score,
                    },
                }
            }
            State::Finished { score, .. } => SyncMessage::Finished {
                score: *score,
                total: quiz::TOTAL_QUESTIONS_PER_TOPIC,
            },
            State::Error { message } => SyncMessage::Error {
                message: message.clone(),
            },
        }
    }

    /// Sends a full snapshot of the current view to the screen
    pub fn sync<S: Screen>(&self, screen: &S) {
        screen.sync(&self.sync_message().into());
    }

    fn announce_question<S: Screen>(active: &Active, screen: &S) {
        let question = active.current_question();
        screen.show(
            &UpdateMessage::QuestionAnnouncement {
                ordinal: active.position.ordinal(),
                total: quiz::TOTAL_QUESTIONS_PER_TOPIC,
                prompt: question.prompt.clone(),
                options: question.options.clone(),
                score: active.score,
                duration: Duration::from_secs(clock::QUESTION_SECONDS),
            }
            .into(),
        );
    }

    fn announce_explanation<S: Screen>(active: &Active, screen: &S) {
        let question = active.current_question();
        screen.show(
            &UpdateMessage::Explanation {
                outcome: active.outcome.unwrap_or(AnswerOutcome::Unanswered),
                correct_index: question.correct_index().unwrap_or_default(),
                explanation: question.explanation.clone(),
                image: active.image.clone(),
                score: active.score,
            }
            .into(),
        );
    }

    fn schedule_tick(position: Position, schedule_alarm: &mut impl FnMut(crate::AlarmMessage, Duration)) {
        schedule_alarm(
            AlarmMessage::ClockTick { position }.into(),
            Duration::from_secs(clock::TICK_INTERVAL_SECONDS),
        );
    }

    fn dispatch_illustration(active: &Active, request: &mut impl FnMut(IllustrationRequest)) {
        let question = active.current_question();
        request(IllustrationRequest {
            prompt: question.image_prompt.clone(),
            token: active.image_token,
            position: active.position,
        });
    }
}
