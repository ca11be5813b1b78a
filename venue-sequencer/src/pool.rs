//! Pool identity
//!
//! A pool is named by the ordered pair of assets it trades plus its fee tier.
//! The identifier is the Keccak-256 digest of the two addresses followed by
//! the fee as a big-endian 24-bit value. Order is significant: the registry
//! derives ids the same way and never sorts the pair.

use crate::types::FeeTier;
use node_client::{encode_hex, keccak256, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pool identifier (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct PoolId([u8; 32]);

impl PoolId {
    /// Derive the id for `(asset_a, asset_b, fee)`
    pub fn derive(asset_a: Address, asset_b: Address, fee: FeeTier) -> Self {
        let mut preimage = [0u8; 43];
        preimage[..20].copy_from_slice(asset_a.as_bytes());
        preimage[20..40].copy_from_slice(asset_b.as_bytes());
        preimage[40..].copy_from_slice(&fee.to_be24());
        Self(keccak256(&preimage))
    }

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<PoolId> for String {
    fn from(id: PoolId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex(&self.0))
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({})", self)
    }
}

/// The pool a run creates and trades against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKey {
    /// Fungible asset (first in the pair)
    pub asset: Address,
    /// Native settlement asset (second in the pair)
    pub native: Address,
    /// Fee tier
    pub fee: FeeTier,
}

impl PoolKey {
    /// Pool id for this key
    pub fn id(&self) -> PoolId {
        PoolId::derive(self.asset, self.native, self.fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PoolKey {
        PoolKey {
            asset: Address::from_bytes([0x11; 20]),
            native: Address::from_bytes([0x22; 20]),
            fee: FeeTier::new(500).unwrap(),
        }
    }

    #[test]
    fn test_pool_id_deterministic() {
        assert_eq!(key().id(), key().id());
    }

    #[test]
    fn test_pool_id_matches_manual_digest() {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&[0x11; 20]);
        preimage.extend_from_slice(&[0x22; 20]);
        preimage.extend_from_slice(&[0x00, 0x01, 0xf4]);

        assert_eq!(key().id().as_bytes(), &keccak256(&preimage));
    }

    #[test]
    fn test_pool_id_order_sensitive() {
        let k = key();
        let swapped = PoolId::derive(k.native, k.asset, k.fee);
        assert_ne!(k.id(), swapped);
    }

    #[test]
    fn test_pool_id_depends_on_fee() {
        let k = key();
        let other = PoolId::derive(k.asset, k.native, FeeTier::new(3000).unwrap());
        assert_ne!(k.id(), other);
    }

    #[test]
    fn test_pool_id_display() {
        let id = PoolId::from_bytes([0xab; 32]);
        assert_eq!(id.to_string(), format!("0x{}", "ab".repeat(32)));
    }
}
