//! Error type shared by every store operation.

use thiserror::Error;

/// Errors raised by the knowledge base.
///
/// Validation variants are always returned before any array is touched, so a
/// rejected append leaves the store unchanged.
#[derive(Debug, Error)]
pub enum KbError {
    #[error("each context should at least have one point of interest")]
    NoSpans,

    #[error("context must contain at least one token")]
    EmptyContext,

    #[error("answers must align with spans: got {answers} answers for {spans} spans")]
    AnswerCountMismatch { spans: usize, answers: usize },

    #[error("need to provide entity names for all spans: got {entities} names for {spans} spans")]
    EntityCountMismatch { spans: usize, entities: usize },

    #[error("span ({start}, {end}) is not a non-empty range inside a context of length {len}")]
    SpanOutOfBounds { start: u32, end: u32, len: usize },

    #[error("dataset `{dataset}` stores {expected} answers; cannot mix explicit and defaulted answers")]
    AnswerModeMismatch { dataset: String, expected: &'static str },

    #[error("unknown dataset `{0}`")]
    UnknownDataset(String),

    #[error("index {index} out of range for dataset `{dataset}` with {len} entries")]
    IndexOutOfRange {
        dataset: String,
        index: usize,
        len: usize,
    },

    #[error("id {id} is not in the {vocab} vocabulary")]
    UnknownId { vocab: &'static str, id: u32 },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshotVersion { found: u32, expected: u32 },

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KbError {
    /// Whether this error was raised by input validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KbError::NoSpans
                | KbError::EmptyContext
                | KbError::AnswerCountMismatch { .. }
                | KbError::EntityCountMismatch { .. }
                | KbError::SpanOutOfBounds { .. }
                | KbError::AnswerModeMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, KbError>;
