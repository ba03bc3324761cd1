//! Error types for bazaar-core.

use thiserror::Error;

/// Errors that can occur handling market primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Address bytes or string could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Stored bytes could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
