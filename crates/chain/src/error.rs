//! Error types for the simulated blockchain.

use thiserror::Error;

/// Latest `.chain` document version understood by this crate.
pub const CHAIN_FORMAT_VERSION: u32 = 1;

/// Blockchain errors.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Underlying file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be parsed
    #[error("Malformed chain document: {0}")]
    Malformed(String),

    /// Document version is not understood
    #[error("Unsupported chain format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Named address does not exist
    #[error("Unknown address: {name}")]
    UnknownAddress { name: String },
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Malformed(err.to_string())
    }
}

/// Result type for blockchain operations.
pub type ChainResult<T> = std::result::Result<T, ChainError>;
