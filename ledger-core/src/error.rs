//! Error types for the core crate

use thiserror::Error;

/// Core ledger errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// A transport record is missing a field or has the wrong shape
    #[error("Invalid field `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// Transactions are not numbered `0..n` in order
    #[error("Invalid sequence at position {index}: expected {expected}, found {found}")]
    Sequence { index: usize, expected: u64, found: u64 },

    /// A merkle tree needs at least one leaf
    #[error("Cannot build a merkle tree without leaves")]
    EmptyTree,

    /// Value does not fit the canonical fixed-width encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Leaf index past the end of the tree
    #[error("Index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },

    /// Key material rejected by secp256k1
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Malformed hex text
    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for a validation failure on `field`
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
