//! Quiz content data model
//!
//! Defines the validated shapes a content fetch must produce (questions,
//! fixed-size question sets, and the full per-session content) together
//! with the session position arithmetic. All content is immutable once
//! received; the wire field names follow the generation service schema
//! (camelCase).

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::quiz;

/// A single trivia question as returned by the generation service
///
/// Immutable once received. Option strings are not required to be unique,
/// but the correct answer must equal one of them; use
/// [`Question::correct_index`] to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question text presented to the player
    #[garde(length(min = 1))]
    #[serde(rename = "question")]
    pub prompt: String,
    /// The answer options, exactly [`quiz::OPTION_COUNT`] of them
    #[garde(length(equal = quiz::OPTION_COUNT))]
    pub options: Vec<String>,
    /// The correct option; must equal a member of `options`
    #[garde(length(min = 1))]
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    /// Short explanation shown after the question resolves
    #[garde(skip)]
    pub explanation: String,
    /// Short English description used to generate the illustration
    #[garde(skip)]
    #[serde(rename = "imagePrompt")]
    pub image_prompt: String,
}

impl Question {
    /// Resolves the index of the correct answer within the options
    ///
    /// Returns `None` when the correct answer is not a member of the
    /// options, which marks the question as structurally invalid.
    pub fn correct_index(&self) -> Option<usize> {
        self.options
            .iter()
            .position(|option| *option == self.correct_answer)
    }

    /// Whether the option at `index` is the correct answer
    pub fn is_correct(&self, index: usize) -> bool {
        self.options
            .get(index)
            .is_some_and(|option| *option == self.correct_answer)
    }
}

/// A fixed-size batch of questions grouped for fetch efficiency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuestionSet {
    /// The questions in this set, exactly [`quiz::QUESTIONS_PER_SET`]
    #[garde(length(equal = quiz::QUESTIONS_PER_SET), dive)]
    pub questions: Vec<Question>,
}

/// Raised when a flat question list does not chunk into the expected
/// set shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "{questions} questions could not be arranged into {} sets of {}",
    quiz::SETS_PER_TOPIC,
    quiz::QUESTIONS_PER_SET
)]
pub struct ShapeError {
    /// Number of questions that failed to chunk
    pub questions: usize,
}

/// The full content of one quiz session
///
/// Exactly [`quiz::SETS_PER_TOPIC`] sets of
/// [`quiz::QUESTIONS_PER_SET`] questions each. Produced once per session
/// and owned exclusively by the session controller for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuizContent {
    #[garde(length(equal = quiz::SETS_PER_TOPIC), dive)]
    sets: Vec<QuestionSet>,
}

impl QuizContent {
    /// Chunks a flat question list into the nested session shape
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] when the list does not split into exactly
    /// [`quiz::SETS_PER_TOPIC`] sets of [`quiz::QUESTIONS_PER_SET`].
    pub fn from_flat(questions: Vec<Question>) -> Result<Self, ShapeError> {
        let total = questions.len();
        let chunks = questions.into_iter().chunks(quiz::QUESTIONS_PER_SET);
        let sets: Vec<QuestionSet> = chunks
            .into_iter()
            .map(|chunk| QuestionSet {
                questions: chunk.collect(),
            })
            .collect();

        if sets.len() != quiz::SETS_PER_TOPIC
            || sets
                .iter()
                .any(|set| set.questions.len() != quiz::QUESTIONS_PER_SET)
        {
            return Err(ShapeError { questions: total });
        }

        Ok(Self { sets })
    }

    /// Returns the question at the given session position, if any
    pub fn question(&self, position: Position) -> Option<&Question> {
        self.sets
            .get(position.set)?
            .questions
            .get(position.question)
    }

    /// The question sets in presentation order
    pub fn sets(&self) -> &[QuestionSet] {
        &self.sets
    }

    /// Iterates over every question in presentation order
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sets.iter().flat_map(|set| set.questions.iter())
    }

    /// Total number of questions across all sets
    pub fn total_questions(&self) -> usize {
        self.sets.iter().map(|set| set.questions.len()).sum()
    }
}

/// A position within the session's content: (set index, question index)
///
/// Advances monotonically from [`Position::START`] to the terminal
/// position; it never decreases.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Index of the current question set
    pub set: usize,
    /// Index of the current question within its set
    pub question: usize,
}

impl Position {
    /// The first position of every session: set 0, question 0
    pub const START: Position = Position {
        set: 0,
        question: 0,
    };

    /// The flattened index of this position, always in
    /// `[0, TOTAL_QUESTIONS_PER_TOPIC)`
    pub fn linear_index(self) -> usize {
        self.set * quiz::QUESTIONS_PER_SET + self.question
    }

    /// The 1-based question number shown to the player
    pub fn ordinal(self) -> usize {
        self.linear_index() + 1
    }

    /// The position following this one, or `None` when advancing would
    /// reach [`quiz::TOTAL_QUESTIONS_PER_TOPIC`] and the session is over
    pub fn advanced(self) -> Option<Position> {
        let next = if self.question + 1 >= quiz::QUESTIONS_PER_SET {
            Position {
                set: self.set + 1,
                question: 0,
            }
        } else {
            Position {
                set: self.set,
                question: self.question + 1,
            }
        };
        (next.linear_index() < quiz::TOTAL_QUESTIONS_PER_TOPIC).then_some(next)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

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

    fn sample_questions(count: usize) -> Vec<Question> {
        (0..count).map(sample_question).collect()
    }

    #[test]
    fn test_question_validates() {
        assert!(sample_question(0).validate().is_ok());
    }

    #[test]
    fn test_question_wrong_option_count_fails_validation() {
        let mut question = sample_question(0);
        question.options.pop();
        assert!(question.validate().is_err());

        question.options.push("Wrong C".to_string());
        question.options.push("Wrong D".to_string());
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_correct_index() {
        let question = sample_question(3);
        assert_eq!(question.correct_index(), Some(0));
        assert!(question.is_correct(0));
        assert!(!question.is_correct(1));
        assert!(!question.is_correct(quiz::OPTION_COUNT));
    }

    #[test]
    fn test_correct_answer_missing_from_options() {
        let mut question = sample_question(0);
        question.correct_answer = "Nowhere".to_string();
        assert_eq!(question.correct_index(), None);
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let json = serde_json::to_value(sample_question(1)).unwrap();
        assert!(json.get("question").is_some());
        assert!(json.get("correctAnswer").is_some());
        assert!(json.get("imagePrompt").is_some());
        assert!(json.get("prompt").is_none());
    }

    #[test]
    fn test_from_flat_exact_count() {
        let content =
            QuizContent::from_flat(sample_questions(quiz::TOTAL_QUESTIONS_PER_TOPIC)).unwrap();
        assert_eq!(content.sets().len(), quiz::SETS_PER_TOPIC);
        assert_eq!(content.total_questions(), quiz::TOTAL_QUESTIONS_PER_TOPIC);
        assert!(content.validate().is_ok());
    }

    #[test]
    fn test_from_flat_wrong_count() {
        let error = QuizContent::from_flat(sample_questions(7)).unwrap_err();
        assert_eq!(error.questions, 7);
        assert!(QuizContent::from_flat(sample_questions(12)).is_err());
    }

    #[test]
    fn test_question_lookup_by_position() {
        let content =
            QuizContent::from_flat(sample_questions(quiz::TOTAL_QUESTIONS_PER_TOPIC)).unwrap();
        let first = content.question(Position::START).unwrap();
        assert_eq!(first.prompt, "Question 0");

        let second_set = content
            .question(Position {
                set: 1,
                question: 2,
            })
            .unwrap();
        assert_eq!(second_set.prompt, "Question 7");

        assert!(
            content
                .question(Position {
                    set: 2,
                    question: 0,
                })
                .is_none()
        );
    }

    #[test]
    fn test_position_linear_index_strictly_increases() {
        let mut position = Position::START;
        let mut seen = vec![position.linear_index()];
        while let Some(next) = position.advanced() {
            assert_eq!(next.linear_index(), position.linear_index() + 1);
            position = next;
            seen.push(position.linear_index());
        }
        assert_eq!(seen.len(), quiz::TOTAL_QUESTIONS_PER_TOPIC);
        assert_eq!(
            position.linear_index(),
            quiz::TOTAL_QUESTIONS_PER_TOPIC - 1
        );
    }

    #[test]
    fn test_position_set_boundary() {
        let last_of_first_set = Position {
            set: 0,
            question: quiz::QUESTIONS_PER_SET - 1,
        };
        assert_eq!(
            last_of_first_set.advanced(),
            Some(Position {
                set: 1,
                question: 0,
            })
        );
    }

    #[test]
    fn test_position_ordinal() {
        assert_eq!(Position::START.ordinal(), 1);
        assert_eq!(
            Position {
                set: 1,
                question: 4,
            }
            .ordinal(),
            quiz::TOTAL_QUESTIONS_PER_TOPIC
        );
    }
}
