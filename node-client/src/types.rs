//! Core chain types shared by the client and the sequencer
//!
//! Addresses and hashes are fixed-width byte arrays that serialize as
//! `0x`-prefixed lowercase hex, the way ledger nodes expect them on the wire.

use crate::{hash::keccak256, Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decode a hex string with an optional `0x` prefix
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let stripped = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    Ok(hex::decode(stripped)?)
}

/// Encode bytes as `0x`-prefixed lowercase hex
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Account or contract address (20 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive an address from a public key (last 20 bytes of its Keccak-256 hash)
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = keccak256(public_key);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_hex(s)?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Parse(format!("address must be 20 bytes, got {}", bytes.len())))?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Transaction hash (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_hex(s)?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::Parse(format!("hash must be 32 bytes, got {}", bytes.len())))?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for TxHash {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.to_string()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_hex(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

/// Unsigned transaction descriptor
///
/// Built fresh for every submission attempt and consumed by the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// Sender
    pub from: Address,
    /// Destination contract
    pub to: Address,
    /// Attached native value (0 when none)
    pub value: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas price (wei)
    pub gas_price: u128,
    /// Sender nonce
    pub nonce: u64,
    /// Chain id
    pub chain_id: u64,
    /// Call data
    pub data: Bytes,
}

impl UnsignedTransaction {
    /// Deterministic byte encoding used as the signing message.
    ///
    /// Layout: chain id, nonce, from, to, value, gas limit, gas price (all
    /// fixed-width big-endian), then the call data length and call data.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 8 + 20 + 20 + 16 + 8 + 16 + 4 + self.data.len());
        bytes.extend_from_slice(&self.chain_id.to_be_bytes());
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes.extend_from_slice(self.from.as_bytes());
        bytes.extend_from_slice(self.to.as_bytes());
        bytes.extend_from_slice(&self.value.to_be_bytes());
        bytes.extend_from_slice(&self.gas_limit.to_be_bytes());
        bytes.extend_from_slice(&self.gas_price.to_be_bytes());
        bytes.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// Signed transaction payload, opaque to everything but the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    raw: Bytes,
    hash: TxHash,
}

impl SignedTransaction {
    /// Wrap a raw payload; the hash is the Keccak-256 of the payload
    pub fn new(raw: impl Into<Bytes>) -> Self {
        let raw = raw.into();
        let hash = TxHash(keccak256(&raw));
        Self { raw, hash }
    }

    /// Raw payload
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Hash the node will report for this payload
    pub fn hash(&self) -> TxHash {
        self.hash
    }
}

/// Event log emitted by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<[u8; 32]>,
    /// Unindexed data
    pub data: Bytes,
}

/// Outcome of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash
    pub transaction_hash: TxHash,
    /// Execution succeeded (false = reverted)
    pub success: bool,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Gas consumed
    pub gas_used: u64,
    /// Emitted events
    pub logs: Vec<Log>,
}
