//! Quiz error types.
//!
//! These represent malformed bank data, tampered input and misuse of the
//! answer flow. None of them is fatal: the quiz remains usable after any of
//! them and the UI shows a generic retry notice.

use thiserror::Error;

use crate::model::Tier;

/// Errors that can occur while progressing through a quiz.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    /// The bank has no question at the requested position.
    #[error("no question at index {index} of {tier} tier ({len} available)")]
    OutOfRange { tier: Tier, index: usize, len: usize },

    /// The selected option does not exist on the current question.
    #[error("option {index} is out of range ({count} options)")]
    InvalidOption { index: usize, count: usize },

    /// The quiz is not accepting answers (not started or already finished).
    #[error("quiz is not in progress")]
    NotInProgress,

    /// No question is currently presented to the player.
    #[error("no question is currently presented")]
    NoActiveQuestion,

    /// Another answer is still being recorded.
    #[error("an answer is already being submitted")]
    SubmissionInFlight,
}

impl QuizError {
    /// Returns `true` for data/input errors the player can recover from by
    /// choosing again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QuizError::OutOfRange { .. } | QuizError::InvalidOption { .. }
        )
    }
}
