use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The model cannot assign a finite likelihood to the sequence.
    #[error("score undefined: {0}")]
    ScoreUndefined(String),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is the per-(sequence, label) failure the recognizer tolerates.
    pub fn is_score_undefined(&self) -> bool {
        matches!(self, Error::ScoreUndefined(..))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
