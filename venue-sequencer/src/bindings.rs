//! Contract call encoding for the venue registry and the fungible asset
//!
//! Only static argument types are needed, so every argument is one 32-byte
//! word after the 4-byte selector.

use crate::error::{Error, Result};
use crate::pool::{PoolId, PoolKey};
use bytes::Bytes;
use node_client::{keccak256, Address};

const WORD: usize = 32;

/// First four bytes of the Keccak-256 of a function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Call data builder
#[derive(Debug, Clone)]
pub struct CallData {
    buf: Vec<u8>,
}

impl CallData {
    /// Start a call to `signature`
    pub fn new(signature: &str) -> Self {
        let mut buf = Vec::with_capacity(4 + 4 * WORD);
        buf.extend_from_slice(&selector(signature));
        Self { buf }
    }

    /// Append a left-padded address word
    pub fn address(mut self, address: Address) -> Self {
        self.buf.extend_from_slice(&[0u8; 12]);
        self.buf.extend_from_slice(address.as_bytes());
        self
    }

    /// Append a `uint` word
    pub fn uint(mut self, value: u128) -> Self {
        self.buf.extend_from_slice(&[0u8; 16]);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Append a `bool` word
    pub fn boolean(self, value: bool) -> Self {
        self.uint(u128::from(value))
    }

    /// Append a raw 32-byte word
    pub fn word(mut self, word: &[u8; 32]) -> Self {
        self.buf.extend_from_slice(word);
        self
    }

    /// Finished call data
    pub fn finish(self) -> Bytes {
        Bytes::from(self.buf)
    }
}

/// Decode a single `uint256` return value that fits in `u128`
pub fn decode_uint(output: &[u8]) -> Result<u128> {
    if output.len() < WORD {
        return Err(Error::Decode(format!(
            "expected a 32-byte word, got {} bytes",
            output.len()
        )));
    }
    let (high, low) = output[..WORD].split_at(16);
    if high.iter().any(|b| *b != 0) {
        return Err(Error::Decode("uint256 exceeds 128 bits".to_string()));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(low);
    Ok(u128::from_be_bytes(bytes))
}

/// Venue registry contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueRegistry {
    address: Address,
}

impl VenueRegistry {
    /// Bind to a deployed registry
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Registry address
    pub fn address(&self) -> Address {
        self.address
    }

    /// `createPool(address,address,uint24)`
    pub fn create_pool(&self, key: &PoolKey) -> Bytes {
        CallData::new("createPool(address,address,uint24)")
            .address(key.asset)
            .address(key.native)
            .uint(u128::from(key.fee.value()))
            .finish()
    }

    /// `addLiquidity(bytes32,uint256,uint256)`
    pub fn add_liquidity(&self, pool: PoolId, asset_amount: u128, native_amount: u128) -> Bytes {
        CallData::new("addLiquidity(bytes32,uint256,uint256)")
            .word(pool.as_bytes())
            .uint(asset_amount)
            .uint(native_amount)
            .finish()
    }

    /// `swap(bytes32,bool,uint256,uint256)`
    pub fn swap(&self, pool: PoolId, zero_for_one: bool, amount_in: u128, min_amount_out: u128) -> Bytes {
        CallData::new("swap(bytes32,bool,uint256,uint256)")
            .word(pool.as_bytes())
            .boolean(zero_for_one)
            .uint(amount_in)
            .uint(min_amount_out)
            .finish()
    }
}

/// Fungible asset contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FungibleAsset {
    address: Address,
}

impl FungibleAsset {
    /// Bind to a deployed asset
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Asset address
    pub fn address(&self) -> Address {
        self.address
    }

    /// `balanceOf(address)`
    pub fn balance_of(&self, owner: Address) -> Bytes {
        CallData::new("balanceOf(address)").address(owner).finish()
    }

    /// `approve(address,uint256)`
    pub fn approve(&self, spender: Address, amount: u128) -> Bytes {
        CallData::new("approve(address,uint256)")
            .address(spender)
            .uint(amount)
            .finish()
    }

    /// `transfer(address,uint256)`
    pub fn transfer(&self, to: Address, amount: u128) -> Bytes {
        CallData::new("transfer(address,uint256)")
            .address(to)
            .uint(amount)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeeTier;

    #[test]
    fn test_well_known_selectors() {
        assert_eq!(selector("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_approve_layout() {
        let asset = FungibleAsset::new(Address::from_bytes([1; 20]));
        let spender = Address::from_bytes([2; 20]);
        let data = asset.approve(spender, 1_000);

        assert_eq!(data.len(), 4 + 2 * WORD);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], spender.as_bytes());
        assert_eq!(decode_uint(&data[36..]).unwrap(), 1_000);
    }

    #[test]
    fn test_swap_layout() {
        let registry = VenueRegistry::new(Address::from_bytes([9; 20]));
        let pool = PoolId::from_bytes([0xcd; 32]);
        let data = registry.swap(pool, true, 150, 0);

        assert_eq!(data.len(), 4 + 4 * WORD);
        assert_eq!(&data[4..36], pool.as_bytes());
        assert_eq!(data[67], 1);
        assert_eq!(decode_uint(&data[68..100]).unwrap(), 150);
        assert_eq!(decode_uint(&data[100..]).unwrap(), 0);
    }

    #[test]
    fn test_create_pool_encodes_fee() {
        let registry = VenueRegistry::new(Address::from_bytes([9; 20]));
        let key = PoolKey {
            asset: Address::from_bytes([1; 20]),
            native: Address::from_bytes([2; 20]),
            fee: FeeTier::new(500).unwrap(),
        };
        let data = registry.create_pool(&key);
        assert_eq!(decode_uint(&data[68..]).unwrap(), 500);
    }

    #[test]
    fn test_decode_uint_rejects_short_and_wide() {
        assert!(decode_uint(&[0u8; 31]).is_err());
        let mut wide = [0u8; 32];
        wide[0] = 1;
        assert!(decode_uint(&wide).is_err());
    }
}
