//! JSON-RPC over HTTP connector

use crate::{rpc::RpcClient, types::*, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-RPC connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcConfig {
    /// Node endpoint (e.g. `http://127.0.0.1:8545`)
    pub endpoint: String,
    /// Per-request HTTP timeout (seconds)
    pub request_timeout_seconds: u64,
    /// Receipt poll interval (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for JsonRpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            request_timeout_seconds: crate::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            poll_interval_ms: crate::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

impl TryFrom<RpcReceipt> for Receipt {
    type Error = Error;

    fn try_from(raw: RpcReceipt) -> Result<Self> {
        // Pre-Byzantium nodes omit `status`; without it we cannot tell a revert
        // from a success, so treat it as malformed.
        let status = raw
            .status
            .ok_or_else(|| Error::InvalidResponse("receipt has no status field".to_string()))?;

        let logs = raw
            .logs
            .into_iter()
            .map(|log| -> Result<Log> {
                let topics = log
                    .topics
                    .iter()
                    .map(|topic| parse_word(topic))
                    .collect::<Result<Vec<[u8; 32]>>>()?;
                Ok(Log {
                    address: log.address,
                    topics,
                    data: Bytes::from(decode_hex(&log.data)?),
                })
            })
            .collect::<Result<Vec<Log>>>()?;

        let block_number = match raw.block_number.as_deref() {
            Some(quantity) => parse_u64(quantity, "blockNumber")?,
            None => 0,
        };
        let gas_used = match raw.gas_used.as_deref() {
            Some(quantity) => parse_u64(quantity, "gasUsed")?,
            None => 0,
        };

        Ok(Receipt {
            transaction_hash: raw.transaction_hash,
            success: parse_quantity(&status)? == 1,
            block_number,
            gas_used,
            logs,
        })
    }
}

/// Parse a 32-byte hex word (log topic)
fn parse_word(value: &str) -> Result<[u8; 32]> {
    let bytes = decode_hex(value)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidResponse(format!("topic is not 32 bytes: {}", value)))
}

/// Parse a receipt quantity that must fit in 64 bits
fn parse_u64(value: &str, field: &str) -> Result<u64> {
    let quantity = parse_quantity(value)?;
    u64::try_from(quantity)
        .map_err(|_| Error::InvalidResponse(format!("{} overflows u64: {}", field, value)))
}

/// Parse a hex quantity such as `0x1a`
pub fn parse_quantity(value: &str) -> Result<u128> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| Error::Parse(format!("quantity must start with 0x: {}", value)))?;
    if digits.is_empty() {
        return Err(Error::Parse("empty quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| Error::Parse(format!("invalid quantity '{}': {}", value, e)))
}

/// JSON-RPC connector
pub struct JsonRpcClient {
    config: JsonRpcConfig,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create new connector
    pub fn new(config: JsonRpcConfig) -> Result<Self> {
        if config.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC request and return the raw `result`
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("rpc #{} {} -> {}", id, method, self.config.endpoint);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", method, e)))?;

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Request a hex quantity result
    async fn request_quantity(&self, method: &str, params: Value) -> Result<u128> {
        match self.request(method, params).await? {
            Value::String(quantity) => parse_quantity(&quantity),
            other => Err(Error::InvalidResponse(format!(
                "{} returned non-string result: {}",
                method, other
            ))),
        }
    }

    /// Fetch a receipt once; `None` while the transaction is pending
    async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let raw: RpcReceipt = serde_json::from_value(result)?;
        Ok(Some(raw.try_into()?))
    }
}

#[async_trait]
impl RpcClient for JsonRpcClient {
    async fn nonce(&self, address: Address) -> Result<u64> {
        let nonce = self
            .request_quantity("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        u64::try_from(nonce).map_err(|_| Error::InvalidResponse(format!("nonce overflow: {}", nonce)))
    }

    async fn gas_price(&self) -> Result<u128> {
        self.request_quantity("eth_gasPrice", json!([])).await
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash> {
        let params = json!([encode_hex(tx.raw())]);

        let result = match self.request("eth_sendRawTransaction", params).await {
            Ok(result) => result,
            Err(Error::Rpc { message, .. }) => return Err(Error::from_rejection(message)),
            Err(e) => return Err(e),
        };

        let hash: TxHash = serde_json::from_value(result)?;
        if hash != tx.hash() {
            warn!(
                "Node reported hash {} for payload hashed locally as {}",
                hash,
                tx.hash()
            );
        }
        Ok(hash)
    }

    async fn await_receipt(&self, hash: TxHash, timeout: Duration) -> Result<Receipt> {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        // The transaction is already submitted, so a failed poll says nothing
        // about its outcome. Only a malformed receipt ends the wait early.
        let wait = async {
            loop {
                match self.receipt(hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {}
                    Err(e @ (Error::Transport(_) | Error::Rpc { .. })) => {
                        warn!("Receipt poll for {} failed, retrying: {}", hash, e);
                    }
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::ConfirmationTimeout {
                hash,
                waited: timeout,
            })?
    }

    async fn balance(&self, address: Address) -> Result<u128> {
        self.request_quantity("eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes> {
        let params = json!([{ "to": to, "data": encode_hex(data) }, "latest"]);
        match self.request("eth_call", params).await? {
            Value::String(output) => Ok(Bytes::from(decode_hex(&output)?)),
            other => Err(Error::InvalidResponse(format!(
                "eth_call returned non-string result: {}",
                other
            ))),
        }
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
