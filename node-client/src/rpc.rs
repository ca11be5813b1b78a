//! Ledger node interface

use crate::{types::*, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Capability-typed connection to a ledger node
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Next nonce the node expects from `address` (pending transactions included)
    async fn nonce(&self, address: Address) -> Result<u64>;

    /// Current gas price suggested by the node (wei)
    async fn gas_price(&self) -> Result<u128>;

    /// Submit a signed transaction; returns the hash the node accepted it under
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash>;

    /// Block until the transaction has a receipt or `timeout` elapses
    async fn await_receipt(&self, hash: TxHash, timeout: Duration) -> Result<Receipt>;

    /// Native balance of `address` (wei)
    async fn balance(&self, address: Address) -> Result<u128>;

    /// Read-only contract call against the latest block
    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes>;

    /// Node endpoint, for logging
    fn endpoint(&self) -> &str;
}
