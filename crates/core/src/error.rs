use thiserror::Error;

use crate::model::{ParseChoiceError, ParseQuestionIdError, ScoreError};

/// Catalog/map mismatches. These indicate a defect, not bad user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IntegrityError {
    #[error("question ordinal {0} is outside 1..=20")]
    OrdinalOutOfRange(u8),

    #[error("question ordinal {0} has no dimension map entry")]
    MissingMapEntry(u8),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    QuestionId(#[from] ParseQuestionIdError),
    #[error(transparent)]
    Choice(#[from] ParseChoiceError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}
