//! Error types for the sequencer

use crate::types::{Operation, Stage};
use node_client::TxHash;
use thiserror::Error;

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single lifecycle step failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Node unreachable or timed out before accepting the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// Node answered with an error or an unreadable response
    #[error("Node error: {0}")]
    Node(String),

    /// Node refused the submission before inclusion
    #[error("Rejected by node: {0}")]
    Rejected(String),

    /// Nonce still mismatched after one resync
    #[error("Nonce mismatch: {0}")]
    NonceMismatch(String),

    /// Pool creation refused because the pool is already registered
    #[error("Pool already exists: {0}")]
    PoolAlreadyExists(String),

    /// Included but execution failed
    #[error("Transaction {hash} reverted")]
    Reverted {
        /// Transaction hash
        hash: TxHash,
    },

    /// No receipt within the bound; the transaction may still confirm later
    #[error("No receipt for {hash} within {waited_ms}ms, outcome unknown")]
    ConfirmationTimeout {
        /// Transaction hash
        hash: TxHash,
        /// How long we waited (milliseconds)
        waited_ms: u64,
    },

    /// Local signing failure
    #[error("Signing error: {0}")]
    Signing(String),

    /// The trade source ran dry
    #[error("Trade source exhausted before trade {index}")]
    TradeSourceExhausted {
        /// Trade index that had no trade
        index: u32,
    },
}

impl From<node_client::Error> for StepError {
    fn from(err: node_client::Error) -> Self {
        use node_client::Error as ClientError;

        match err {
            ClientError::Transport(msg) => StepError::Transport(msg),
            ClientError::Io(e) => StepError::Transport(e.to_string()),
            ClientError::NonceMismatch(msg) => StepError::NonceMismatch(msg),
            ClientError::InsufficientFunds(msg) => {
                StepError::Rejected(format!("insufficient funds: {}", msg))
            }
            ClientError::Rejected(msg) => StepError::Rejected(msg),
            ClientError::ConfirmationTimeout { hash, waited } => StepError::ConfirmationTimeout {
                hash,
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            },
            ClientError::Signing(msg) | ClientError::Secret(msg) => StepError::Signing(msg),
            other => StepError::Node(other.to_string()),
        }
    }
}

/// Sequencer errors
#[derive(Error, Debug)]
pub enum Error {
    /// Node client error outside a lifecycle step (construction, credentials)
    #[error("Node client error: {0}")]
    Client(#[from] node_client::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A lifecycle step failed and the run stopped
    #[error("{stage} failed{}: {source}", at_operation(.operation))]
    Step {
        /// Stage the run stopped in
        stage: Stage,
        /// Operation that failed, when one was attempted
        operation: Option<Operation>,
        /// Underlying cause
        source: StepError,
    },

    /// Run cancelled between steps
    #[error("Run cancelled {0}")]
    Cancelled(String),

    /// Contract output could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn at_operation(operation: &Option<Operation>) -> String {
    match operation {
        Some(op) => format!(" at {}", op),
        None => String::new(),
    }
}
