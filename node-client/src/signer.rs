//! Transaction signing
//!
//! This module provides:
//! - The `Signer` trait the sequencer signs through
//! - An Ed25519 key-pair signer whose payload is
//!   `canonical_bytes || signature (64) || public key (32)`

use crate::{types::*, Credential, Error, Result};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use std::fmt;

/// Produces signed payloads from unsigned descriptors
pub trait Signer: Send + Sync {
    /// Address transactions are sent from
    fn address(&self) -> Address;

    /// Sign a descriptor
    fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction>;
}

/// Ed25519 key-pair signer
///
/// The payload is not an EVM raw transaction. Use it with nodes that verify
/// this format; EVM chains need a secp256k1 `Signer` plugged in instead.
pub struct KeyPairSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl KeyPairSigner {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        let address = Address::from_public_key(verifying_key.as_bytes());

        Self {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Create from a credential holding a hex-encoded 32-byte seed
    pub fn from_credential(credential: &Credential) -> Result<Self> {
        let bytes = decode_hex(credential.expose())
            .map_err(|_| Error::Signing("credential is not valid hex".to_string()))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            Error::Signing(format!("credential must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify a payload produced by this signer
    pub fn verify(&self, signed: &SignedTransaction) -> Result<()> {
        let raw = signed.raw();
        if raw.len() < 96 {
            return Err(Error::Signing("payload too short".to_string()));
        }

        let (message, trailer) = raw.split_at(raw.len() - 96);
        let signature_bytes: [u8; 64] = trailer[..64]
            .try_into()
            .map_err(|_| Error::Signing("malformed signature".to_string()))?;

        if trailer[64..] != self.verifying_key.to_bytes() {
            return Err(Error::Signing("payload signed by another key".to_string()));
        }

        self.verifying_key
            .verify(message, &Signature::from_bytes(&signature_bytes))
            .map_err(|e| Error::Signing(format!("Verification failed: {}", e)))
    }
}

impl fmt::Debug for KeyPairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer for KeyPairSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction> {
        if tx.from != self.address {
            return Err(Error::Signing(format!(
                "descriptor sender {} does not match signer {}",
                tx.from, self.address
            )));
        }

        let mut payload = tx.canonical_bytes();
        let signature = self.signing_key.sign(&payload);
        payload.extend_from_slice(&signature.to_bytes());
        payload.extend_from_slice(self.verifying_key.as_bytes());

        Ok(SignedTransaction::new(payload))
    }
}
