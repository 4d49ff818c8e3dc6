//! Typed error taxonomy shared by every component of the search core.
//!
//! Library-level APIs (storage, embedding, analyzer, repository, seeder,
//! search) return `Result<T, CoreError>` so callers can match on kind —
//! the tool server maps every variant to JSON-RPC code `-32603`, the CLI
//! prints `Error: <message>` and exits non-zero.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage client is not connected")]
    NotConnected,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("embedding error: {0}")]
    EmbeddingError(String),

    #[error("failed to analyze {path}: {cause}")]
    AnalyzerError { path: String, cause: String },

    #[error("{0}")]
    NotFound(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
