//! Transaction construction
//!
//! Turns an [`Intent`] plus a nonce into an [`UnsignedTransaction`] with the
//! sender, chain id, gas limit and gas price filled in.

use crate::types::Operation;
use bytes::Bytes;
use node_client::{Address, RpcClient, UnsignedTransaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default fixed gas price (20 gwei)
pub const DEFAULT_GAS_PRICE_WEI: u64 = 20_000_000_000;

/// Per-operation gas limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasLimits {
    /// Pool registration
    pub create_pool: u64,
    /// Asset approval
    pub approve: u64,
    /// Liquidity seed
    pub add_liquidity: u64,
    /// Swap
    pub swap: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            create_pool: 2_000_000,
            approve: 100_000,
            add_liquidity: 200_000,
            swap: 200_000,
        }
    }
}

impl GasLimits {
    /// Limit for `operation`
    pub fn for_operation(&self, operation: Operation) -> u64 {
        match operation {
            Operation::CreatePool => self.create_pool,
            Operation::Approve => self.approve,
            Operation::AddLiquidity => self.add_liquidity,
            Operation::Swap => self.swap,
        }
    }
}

/// Where the gas price comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GasPricePolicy {
    /// Constant price in wei
    Fixed {
        /// Price (wei)
        wei: u64,
    },
    /// Ask the node before every step
    Node,
}

impl Default for GasPricePolicy {
    fn default() -> Self {
        GasPricePolicy::Fixed {
            wei: DEFAULT_GAS_PRICE_WEI,
        }
    }
}

/// A call the orchestrator wants to make, before nonce and gas are chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    /// Operation kind
    pub operation: Operation,
    /// Destination contract
    pub to: Address,
    /// Call data
    pub data: Bytes,
    /// Attached native value
    pub value: u128,
}

impl Intent {
    /// Intent with no attached value
    pub fn new(operation: Operation, to: Address, data: Bytes) -> Self {
        Self {
            operation,
            to,
            data,
            value: 0,
        }
    }

    /// Attach native value
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

/// Builds unsigned transactions for one sender
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    sender: Address,
    chain_id: u64,
    limits: GasLimits,
    policy: GasPricePolicy,
}

impl TransactionBuilder {
    /// Create new builder
    pub fn new(sender: Address, chain_id: u64, limits: GasLimits, policy: GasPricePolicy) -> Self {
        Self {
            sender,
            chain_id,
            limits,
            policy,
        }
    }

    /// Sender address
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Gas price for the next step
    pub async fn resolve_gas_price(&self, rpc: &dyn RpcClient) -> node_client::Result<u128> {
        match self.policy {
            GasPricePolicy::Fixed { wei } => Ok(u128::from(wei)),
            GasPricePolicy::Node => {
                let price = rpc.gas_price().await?;
                debug!("Node gas price: {} wei", price);
                Ok(price)
            }
        }
    }

    /// Build the descriptor for `intent` at `nonce`
    pub fn build(&self, intent: &Intent, nonce: u64, gas_price: u128) -> UnsignedTransaction {
        UnsignedTransaction {
            from: self.sender,
            to: intent.to,
            value: intent.value,
            gas_limit: self.limits.for_operation(intent.operation),
            gas_price,
            nonce,
            chain_id: self.chain_id,
            data: intent.data.clone(),
        }
    }
}
