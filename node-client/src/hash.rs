//! Keccak-256 hashing

use sha3::{Digest, Keccak256};

/// Hash arbitrary bytes using Keccak-256
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(keccak256(b"pool"), keccak256(b"pool"));
        assert_ne!(keccak256(b"pool"), keccak256(b"loop"));
    }
}
