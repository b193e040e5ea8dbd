use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::ProblemId;

/// Fatal scoring errors. None of these are retried.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// A bad path or a bad file format
    #[error("invalid input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: InputFault,
    },

    /// An id referenced by the attack file has no problem behind it
    #[error("attack id '{id}' is not present in problems.json")]
    Join { id: ProblemId },

    /// No split problem had a matching prediction
    #[error("no split problem has a matching prediction, accuracy is undefined")]
    EmptyResult,
}

/// What exactly was wrong with an input file.
#[derive(Debug, Error)]
pub enum InputFault {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("problem '{0}' has no answer choices")]
    NoChoices(ProblemId),

    #[error("question id '{0}' is not an integer")]
    NonNumericId(ProblemId),
}

impl ScoreError {
    pub fn input(path: impl Into<PathBuf>, source: impl Into<InputFault>) -> Self {
        ScoreError::Input {
            path: path.into(),
            source: source.into(),
        }
    }
}
