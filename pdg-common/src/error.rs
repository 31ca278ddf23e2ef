//! Common error types for the catalog pipeline

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by the ingestion and reconciliation stages
///
/// Everything here is a local-resource or configuration failure. Network and
/// data-quality problems never surface as `Error`; they degrade to partial
/// output inside the pipeline instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input file or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
