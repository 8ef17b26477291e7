//! Submission-level failures.

use thiserror::Error;

/// Aborts a whole submission. Never produces partial records.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File exceeds the upload limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("Error processing file: {0}")]
    Io(#[from] std::io::Error),
}
