//! Configuration for the sequencer
//!
//! Loaded from TOML, overridden by `SEQUENCER_*` environment variables, then
//! validated before the orchestrator is built.

use crate::builder::{GasLimits, GasPricePolicy};
use crate::driver::TradeBounds;
use crate::error::{Error, Result};
use crate::pool::PoolKey;
use crate::types::FeeTier;
use node_client::{Address, JsonRpcConfig, SecretBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Largest supported decimals for unit scaling
pub const MAX_DECIMALS: u32 = 18;

/// Sequencer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Ledger node
    pub node: NodeConfig,

    /// Signing credential reference
    pub credential: CredentialConfig,

    /// Contracts and pool parameters
    pub assets: AssetConfig,

    /// Gas settings
    pub gas: GasConfig,

    /// Liquidity seed
    pub liquidity: LiquidityConfig,

    /// Trade generation
    pub trading: TradingConfig,

    /// Receipt wait bound per transaction (seconds)
    pub confirmation_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "venue-sequencer".to_string(),
            node: NodeConfig::default(),
            credential: CredentialConfig::default(),
            assets: AssetConfig::default(),
            gas: GasConfig::default(),
            liquidity: LiquidityConfig::default(),
            trading: TradingConfig::default(),
            confirmation_timeout_seconds: 120,
        }
    }
}

/// Ledger node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// JSON-RPC endpoint
    pub endpoint: String,

    /// Chain id stamped on every transaction
    pub chain_id: u64,

    /// Per-request HTTP timeout (seconds)
    pub request_timeout_seconds: u64,

    /// Receipt poll interval (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".to_string(),
            chain_id: 1337,
            request_timeout_seconds: node_client::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            poll_interval_ms: node_client::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl NodeConfig {
    /// Connector configuration
    pub fn rpc_config(&self) -> JsonRpcConfig {
        JsonRpcConfig {
            endpoint: self.endpoint.clone(),
            request_timeout_seconds: self.request_timeout_seconds,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

/// Where the signing key comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Secret backend
    pub source: SecretBackend,

    /// Secret name (variable or file name)
    pub name: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            source: SecretBackend::default(),
            name: "SEQUENCER_SIGNING_KEY".to_string(),
        }
    }
}

/// Contract addresses and pool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Fungible asset contract
    pub asset: Address,

    /// Native settlement asset
    pub native: Address,

    /// Venue registry contract
    pub registry: Address,

    /// Pool fee tier
    pub fee_tier: FeeTier,

    /// Fungible asset decimals
    pub asset_decimals: u32,

    /// Native asset decimals
    pub native_decimals: u32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset: Address::ZERO,
            native: Address::ZERO,
            registry: Address::ZERO,
            fee_tier: FeeTier::default(),
            asset_decimals: 18,
            native_decimals: 18,
        }
    }
}

impl AssetConfig {
    /// Pool the run creates
    pub fn pool_key(&self) -> PoolKey {
        PoolKey {
            asset: self.asset,
            native: self.native,
            fee: self.fee_tier,
        }
    }

    /// Base units per whole asset unit
    pub fn asset_scale(&self) -> Result<u128> {
        unit_scale(self.asset_decimals)
    }

    /// Base units per whole native unit
    pub fn native_scale(&self) -> Result<u128> {
        unit_scale(self.native_decimals)
    }
}

/// Gas configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Per-operation limits
    pub limits: GasLimits,

    /// Price policy
    pub price: GasPricePolicy,
}

/// Liquidity seed, in whole units
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Asset units deposited
    pub asset_units: u64,

    /// Native units deposited
    pub native_units: u64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            asset_units: 10_000,
            native_units: 1,
        }
    }
}

impl LiquidityConfig {
    /// Asset and native amounts in base units
    pub fn amounts(&self, assets: &AssetConfig) -> Result<(u128, u128)> {
        let asset = scale(self.asset_units, assets.asset_scale()?)?;
        let native = scale(self.native_units, assets.native_scale()?)?;
        Ok((asset, native))
    }
}

/// Trade generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Trades per run
    pub trade_count: u32,

    /// Smallest trade (whole asset units)
    pub min_units: u64,

    /// Largest trade (whole asset units)
    pub max_units: u64,

    /// Probability that a trade sells the asset
    pub asset_to_native_probability: f64,

    /// Pause between trades (milliseconds)
    pub delay_ms: u64,

    /// RNG seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            trade_count: 10,
            min_units: 100,
            max_units: 1000,
            asset_to_native_probability: 0.5,
            delay_ms: 1000,
            seed: None,
        }
    }
}

impl TradingConfig {
    /// Trade bounds in base units of the asset
    pub fn bounds(&self, assets: &AssetConfig) -> Result<TradeBounds> {
        TradeBounds::new(self.min_units, self.max_units, assets.asset_scale()?)
    }
}

fn unit_scale(decimals: u32) -> Result<u128> {
    if decimals > MAX_DECIMALS {
        return Err(Error::Config(format!(
            "decimals {} above supported maximum {}",
            decimals, MAX_DECIMALS
        )));
    }
    Ok(10u128.pow(decimals))
}

fn scale(units: u64, scale: u128) -> Result<u128> {
    u128::from(units)
        .checked_mul(scale)
        .ok_or_else(|| Error::Config(format!("{} units overflow base units", units)))
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `SEQUENCER_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(endpoint) = env_parse::<String>("SEQUENCER_RPC_URL")? {
            self.node.endpoint = endpoint;
        }
        if let Some(chain_id) = env_parse("SEQUENCER_CHAIN_ID")? {
            self.node.chain_id = chain_id;
        }
        if let Some(asset) = env_parse("SEQUENCER_ASSET_ADDRESS")? {
            self.assets.asset = asset;
        }
        if let Some(native) = env_parse("SEQUENCER_NATIVE_ADDRESS")? {
            self.assets.native = native;
        }
        if let Some(registry) = env_parse("SEQUENCER_REGISTRY_ADDRESS")? {
            self.assets.registry = registry;
        }
        if let Some(fee) = env_parse::<u32>("SEQUENCER_FEE_TIER")? {
            self.assets.fee_tier = FeeTier::new(fee)?;
        }
        if let Some(count) = env_parse("SEQUENCER_TRADE_COUNT")? {
            self.trading.trade_count = count;
        }
        if let Some(delay) = env_parse("SEQUENCER_TRADE_DELAY_MS")? {
            self.trading.delay_ms = delay;
        }
        if let Some(seed) = env_parse("SEQUENCER_SEED")? {
            self.trading.seed = Some(seed);
        }
        if let Some(name) = env_parse::<String>("SEQUENCER_CREDENTIAL_NAME")? {
            self.credential.name = name;
        }
        Ok(())
    }

    /// Reject configurations the orchestrator cannot run
    pub fn validate(&self) -> Result<()> {
        for (label, address) in [
            ("asset", self.assets.asset),
            ("native", self.assets.native),
            ("registry", self.assets.registry),
        ] {
            if address.is_zero() {
                return Err(Error::Config(format!("{} address is not set", label)));
            }
        }
        if self.assets.asset == self.assets.native {
            return Err(Error::Config(
                "asset and native addresses must differ".to_string(),
            ));
        }

        self.trading.bounds(&self.assets)?;
        self.liquidity.amounts(&self.assets)?;

        let p = self.trading.asset_to_native_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Config(format!(
                "asset_to_native_probability {} outside [0, 1]",
                p
            )));
        }

        if self.confirmation_timeout_seconds == 0 {
            return Err(Error::Config(
                "confirmation_timeout_seconds must be positive".to_string(),
            ));
        }
        if self.node.request_timeout_seconds == 0 || self.node.poll_interval_ms == 0 {
            return Err(Error::Config(
                "node timeouts and poll interval must be positive".to_string(),
            ));
        }
        if self.node.endpoint.trim().is_empty() {
            return Err(Error::Config("node endpoint is empty".to_string()));
        }
        if self.credential.name.trim().is_empty() {
            return Err(Error::Config("credential name is empty".to_string()));
        }

        Ok(())
    }
}
