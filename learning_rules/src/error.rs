//! Error types for the rulebook.

use thiserror::Error;

use crate::entities::CardId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("score {score} is outside 0..=100")]
    InvalidScore { score: u32 },
    #[error("unknown flashcard: {0}")]
    UnknownCard(CardId),
    #[error("flashcard already registered: {0}")]
    DuplicateCard(CardId),
    /// Learner state outside its invariant range. Indicates a bug, never clamped.
    #[error("invariant violated: {message}")]
    InvariantViolation { message: String },
    #[error("validation error: {message}")]
    Validation { message: String },
}

impl RulesError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type RulesResult<T> = Result<T, RulesError>;
