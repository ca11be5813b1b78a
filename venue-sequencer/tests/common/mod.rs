//! In-memory ledger node for lifecycle tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use node_client::{
    Address, KeyPairSigner, Receipt, RpcClient, SignedTransaction, Signer, TxHash,
    UnsignedTransaction,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use venue_sequencer::bindings::selector;
use venue_sequencer::Config;

pub const ASSET: Address = Address::from_bytes([0x11; 20]);
pub const NATIVE: Address = Address::from_bytes([0x22; 20]);
pub const REGISTRY: Address = Address::from_bytes([0x33; 20]);

/// What the node does with the submission at a given ordinal
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Accept, then report a failed receipt
    Revert,
    /// Refuse with this reason
    Reject(String),
    /// Refuse as a stale nonce without touching state
    NonceMismatch,
    /// Another writer used `n` nonces just before this submission
    ExternalBump(u64),
    /// Accept but never produce a receipt
    Timeout,
    /// Accept normally and cancel the token
    Cancel(CancellationToken),
}

/// A submission the node accepted
#[derive(Debug, Clone)]
pub struct Accepted {
    pub hash: TxHash,
    pub to: Address,
    pub selector: [u8; 4],
    pub value: u128,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub data: Bytes,
}

#[derive(Debug, Default)]
struct State {
    chain_nonce: u64,
    gas_price: u128,
    submit_calls: usize,
    nonce_reads: usize,
    behaviours: HashMap<usize, Behaviour>,
    signed: HashMap<TxHash, UnsignedTransaction>,
    accepted: Vec<Accepted>,
    receipts: HashMap<TxHash, Receipt>,
    call_reverts: HashMap<[u8; 4], String>,
}

/// Shared handle to the node state
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    state: Arc<Mutex<State>>,
}

impl MockNode {
    pub fn new(initial_nonce: u64) -> Self {
        let node = Self::default();
        {
            let mut state = node.state.lock().unwrap();
            state.chain_nonce = initial_nonce;
            state.gas_price = 1_000_000_000;
        }
        node
    }

    pub fn with_gas_price(self, wei: u128) -> Self {
        self.state.lock().unwrap().gas_price = wei;
        self
    }

    /// Make `eth_call` revert with `reason` for calls to `selector`
    pub fn revert_calls(&self, selector: [u8; 4], reason: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .call_reverts
            .insert(selector, reason.to_string());
        self
    }

    /// Script the submission at `ordinal` (0-based, counting every submit call)
    pub fn on_submit(&self, ordinal: usize, behaviour: Behaviour) -> &Self {
        self.state
            .lock()
            .unwrap()
            .behaviours
            .insert(ordinal, behaviour);
        self
    }

    pub fn accepted(&self) -> Vec<Accepted> {
        self.state.lock().unwrap().accepted.clone()
    }

    pub fn accepted_selectors(&self) -> Vec<[u8; 4]> {
        self.accepted().iter().map(|a| a.selector).collect()
    }

    pub fn submit_calls(&self) -> usize {
        self.state.lock().unwrap().submit_calls
    }

    pub fn nonce_reads(&self) -> usize {
        self.state.lock().unwrap().nonce_reads
    }

    pub fn chain_nonce(&self) -> u64 {
        self.state.lock().unwrap().chain_nonce
    }

    pub fn signer(&self, seed: u8) -> RecordingSigner {
        RecordingSigner {
            inner: KeyPairSigner::from_seed(&[seed; 32]),
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl RpcClient for MockNode {
    async fn nonce(&self, _address: Address) -> node_client::Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.nonce_reads += 1;
        Ok(state.chain_nonce)
    }

    async fn gas_price(&self) -> node_client::Result<u128> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    async fn submit(&self, tx: &SignedTransaction) -> node_client::Result<TxHash> {
        let mut state = self.state.lock().unwrap();
        let ordinal = state.submit_calls;
        state.submit_calls += 1;

        let unsigned = state
            .signed
            .get(&tx.hash())
            .cloned()
            .ok_or_else(|| node_client::Error::Rejected("unknown payload".to_string()))?;

        let behaviour = state.behaviours.remove(&ordinal);
        match &behaviour {
            Some(Behaviour::Reject(reason)) => {
                return Err(node_client::Error::from_rejection(reason.clone()))
            }
            Some(Behaviour::NonceMismatch) => {
                return Err(node_client::Error::NonceMismatch("nonce too low".to_string()))
            }
            Some(Behaviour::ExternalBump(n)) => state.chain_nonce += n,
            _ => {}
        }

        if unsigned.nonce != state.chain_nonce {
            return Err(node_client::Error::from_rejection(format!(
                "invalid nonce: expected {}, got {}",
                state.chain_nonce, unsigned.nonce
            )));
        }
        state.chain_nonce += 1;

        let hash = tx.hash();
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&unsigned.data[..4]);
        state.accepted.push(Accepted {
            hash,
            to: unsigned.to,
            selector,
            value: unsigned.value,
            nonce: unsigned.nonce,
            gas_price: unsigned.gas_price,
            gas_limit: unsigned.gas_limit,
            data: unsigned.data.clone(),
        });

        let block_number = state.accepted.len() as u64;
        match behaviour {
            Some(Behaviour::Timeout) => {}
            Some(Behaviour::Revert) => {
                state.receipts.insert(hash, receipt(hash, false, block_number));
            }
            Some(Behaviour::Cancel(token)) => {
                state.receipts.insert(hash, receipt(hash, true, block_number));
                token.cancel();
            }
            _ => {
                state.receipts.insert(hash, receipt(hash, true, block_number));
            }
        }

        Ok(hash)
    }

    async fn await_receipt(&self, hash: TxHash, timeout: Duration) -> node_client::Result<Receipt> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .get(&hash)
            .cloned()
            .ok_or(node_client::Error::ConfirmationTimeout {
                hash,
                waited: timeout,
            })
    }

    async fn balance(&self, _address: Address) -> node_client::Result<u128> {
        Ok(100 * 10u128.pow(18))
    }

    async fn call(&self, _to: Address, data: &[u8]) -> node_client::Result<Bytes> {
        let state = self.state.lock().unwrap();
        let revert = data
            .get(..4)
            .and_then(|selector| state.call_reverts.iter().find(|(s, _)| s.as_slice() == selector));
        if let Some((_, reason)) = revert {
            return Err(node_client::Error::Rpc {
                code: 3,
                message: reason.clone(),
            });
        }

        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&(1_000_000 * 10u128.pow(18)).to_be_bytes());
        Ok(Bytes::copy_from_slice(&word))
    }

    fn endpoint(&self) -> &str {
        "mock://node"
    }
}

fn receipt(hash: TxHash, success: bool, block_number: u64) -> Receipt {
    Receipt {
        transaction_hash: hash,
        success,
        block_number,
        gas_used: 50_000,
        logs: Vec::new(),
    }
}

/// Signer that lets the mock node see what was signed
#[derive(Debug)]
pub struct RecordingSigner {
    inner: KeyPairSigner,
    state: Arc<Mutex<State>>,
}

impl Signer for RecordingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign(&self, tx: &UnsignedTransaction) -> node_client::Result<SignedTransaction> {
        let signed = self.inner.sign(tx)?;
        self.state
            .lock()
            .unwrap()
            .signed
            .insert(signed.hash(), tx.clone());
        Ok(signed)
    }
}

pub fn config(trade_count: u32) -> Config {
    let mut config = Config::default();
    config.assets.asset = ASSET;
    config.assets.native = NATIVE;
    config.assets.registry = REGISTRY;
    config.assets.asset_decimals = 0;
    config.assets.native_decimals = 0;
    config.trading.trade_count = trade_count;
    config.trading.delay_ms = 0;
    config.confirmation_timeout_seconds = 1;
    config
}

pub fn create_pool_selector() -> [u8; 4] {
    selector("createPool(address,address,uint24)")
}

pub fn approve_selector() -> [u8; 4] {
    selector("approve(address,uint256)")
}

pub fn add_liquidity_selector() -> [u8; 4] {
    selector("addLiquidity(bytes32,uint256,uint256)")
}

pub fn swap_selector() -> [u8; 4] {
    selector("swap(bytes32,bool,uint256,uint256)")
}
