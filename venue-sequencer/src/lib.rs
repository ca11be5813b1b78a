//! Venue Sequencer
//!
//! Drives a ledger node through the lifecycle of a trading venue: register a
//! pool, seed it with liquidity, then submit a run of randomized swaps.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator ──▶ TransactionBuilder ──▶ Signer ──▶ RpcClient ──▶ node
//!      ▲                                                  │
//!      └──────────────── receipt (await) ◀────────────────┘
//! ```
//!
//! Exactly one transaction is in flight at a time. Every step waits for its
//! receipt before the next step is built, because each step depends on the
//! nonce and on-chain effects of the one before it.
//!
//! # Lifecycle
//!
//! `Idle → PoolCreation → LiquiditySeeding → Trading(1..=N) → Done`, with
//! `Failed(stage, reason)` reachable from every state. There is no rollback:
//! a failure leaves the ledger however the last confirmed step left it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use node_client::{JsonRpcClient, KeyPairSigner};
//! use venue_sequencer::{Config, Orchestrator, RandomTradeDriver};
//!
//! #[tokio::main]
//! async fn main() -> venue_sequencer::Result<()> {
//!     let config = Config::from_file("sequencer.toml")?;
//!     let credential = config.credential.source.fetch(&config.credential.name)?;
//!
//!     let rpc = Arc::new(JsonRpcClient::new(config.node.rpc_config())?);
//!     let signer = Arc::new(KeyPairSigner::from_credential(&credential)?);
//!     let trades = RandomTradeDriver::seeded(7, config.trading.bounds(&config.assets)?, 0.5);
//!
//!     let mut orchestrator = Orchestrator::new(&config, rpc, signer, Box::new(trades))?;
//!     let run = orchestrator.run().await;
//!     println!("{} transactions confirmed", run.confirmed_count());
//!     run.into_result().map(|_| ())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod bindings;
pub mod builder;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod nonce;
pub mod orchestrator;
pub mod pool;
pub mod types;

// Re-exports
pub use bindings::{FungibleAsset, VenueRegistry};
pub use builder::{GasLimits, GasPricePolicy, Intent, TransactionBuilder};
pub use config::Config;
pub use driver::{RandomTradeDriver, ScriptedTrades, TradeBounds, TradeSource};
pub use error::{Error, Result, StepError};
pub use nonce::NonceCounter;
pub use orchestrator::Orchestrator;
pub use pool::{PoolId, PoolKey};
pub use types::*;

/// Minimum output accepted by every swap.
///
/// Zero means swaps carry no slippage protection. This sequencer only
/// exercises a venue; a variant trading real value must compute a bound.
pub const SWAP_MIN_AMOUNT_OUT: u128 = 0;
