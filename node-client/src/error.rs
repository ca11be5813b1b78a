//! Error types for the node client

use crate::types::TxHash;
use std::time::Duration;
use thiserror::Error;

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Node client errors
#[derive(Error, Debug)]
pub enum Error {
    /// Node unreachable or HTTP failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Submission rejected because the nonce did not match the sender's sequence
    #[error("Nonce mismatch: {0}")]
    NonceMismatch(String),

    /// Submission rejected because the sender cannot pay for it
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Submission rejected before inclusion for any other reason
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Receipt not observed within the bound
    #[error("No receipt for {hash} after {waited:?}")]
    ConfirmationTimeout {
        /// Transaction hash
        hash: TxHash,
        /// How long we waited
        waited: Duration,
    },

    /// Malformed response from the node
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Malformed address, hash or quantity
    #[error("Parse error: {0}")]
    Parse(String),

    /// Signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Secret could not be resolved
    #[error("Secret error: {0}")]
    Secret(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hex decoding error
    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the node refused the submission for a nonce mismatch
    pub fn is_nonce_mismatch(&self) -> bool {
        matches!(self, Error::NonceMismatch(_))
    }

    /// Classify a submission error message returned by the node.
    ///
    /// Node implementations word these differently, so matching is done on
    /// lowercase substrings.
    pub fn from_rejection(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("nonce too low")
            || lower.contains("nonce too high")
            || lower.contains("invalid nonce")
            || lower.contains("incorrect nonce")
            || lower.contains("correct nonce")
            || lower.contains("nonce has already been used")
        {
            Error::NonceMismatch(message)
        } else if lower.contains("insufficient funds") {
            Error::InsufficientFunds(message)
        } else {
            Error::Rejected(message)
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
