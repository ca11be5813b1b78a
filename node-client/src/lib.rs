//! # Ledger Node Client
//!
//! Boundary layer between the sequencer and a remote ledger node:
//! - Shared chain types (addresses, hashes, transaction descriptors, receipts)
//! - `RpcClient` trait with a JSON-RPC over HTTP implementation
//! - `Signer` trait with an ed25519 key-pair signer
//! - Pluggable secret sources for the signing credential
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           Sequencer (Orchestrator)           │
//! └──────────┬─────────────────────┬─────────────┘
//!            │ UnsignedTransaction │
//!     ┌──────▼──────┐       ┌──────▼──────┐
//!     │   Signer    │──────▶│  RpcClient  │
//!     │ (key pair)  │ bytes │ (JSON-RPC)  │
//!     └──────▲──────┘       └──────┬──────┘
//!            │                     │ HTTP
//!     ┌──────┴──────┐       ┌──────▼──────┐
//!     │SecretSource │       │ Ledger node │
//!     └─────────────┘       └─────────────┘
//! ```
//!
//! ## Node compatibility
//!
//! `KeyPairSigner` emits its own ed25519 payload format, which only a node
//! that verifies that format will accept. EVM nodes expect RLP-encoded
//! secp256k1 transactions from `eth_sendRawTransaction`; submitting to one
//! requires a `Signer` implementation that produces them.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod hash;
pub mod json_rpc;
pub mod rpc;
pub mod secrets;
pub mod signer;
pub mod types;

pub use error::{Error, Result};
pub use hash::keccak256;
pub use json_rpc::{JsonRpcClient, JsonRpcConfig};
pub use rpc::RpcClient;
pub use secrets::{Credential, SecretBackend, SecretSource};
pub use signer::{KeyPairSigner, Signer};
pub use types::*;

/// Default HTTP request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default receipt poll interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
