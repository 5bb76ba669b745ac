//! Error taxonomy for the meeting pipeline.
//!
//! Uses thiserror so each failure carries a readable message. Which variants
//! are absorbed and which reach the caller is decided in `pipeline`, not here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A remote capability (upload, poll, condense, extract) could not be reached
    /// or answered with a non-success status.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The remote transcription job reached its error state, was cancelled, or timed out.
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// The language model answered with something that is not a JSON array.
    #[error("Malformed extraction: {0}")]
    MalformedExtraction(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// The persisted history could not be parsed.
    #[error("Persistence corruption: {0}")]
    PersistenceCorruption(String),

    /// Writing history or transcripts to disk failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Stable identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::TranscriptionFailed(_) => "transcription_failed",
            Self::MalformedExtraction(_) => "malformed_extraction",
            Self::UnsupportedInput(_) => "unsupported_input",
            Self::PersistenceCorruption(_) => "persistence_corruption",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::ServiceUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
