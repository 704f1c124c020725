//! Error types for Frequalizer

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum FqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown parameter id: {0}")]
    UnknownParam(String),

    #[error("Invalid parameter text for {id}: {text:?}")]
    InvalidParamText { id: String, text: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported snapshot version: {0}")]
    SnapshotVersion(u32),
}

/// Result type alias
pub type FqResult<T> = Result<T, FqError>;
