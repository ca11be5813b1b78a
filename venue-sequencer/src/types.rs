//! Core types for the sequencer
//!
//! Lifecycle phases, step records and the run report.

use crate::error::{Error, Result, StepError};
use crate::pool::PoolId;
use chrono::{DateTime, Utc};
use node_client::{Receipt, TxHash};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Largest fee tier the registry accepts (`uint24`)
pub const MAX_FEE_TIER: u32 = 0x00FF_FFFF;

/// Pool fee tier in hundredths of a basis point (500 = 0.05%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FeeTier(u32);

impl FeeTier {
    /// Create a fee tier; must fit in 24 bits
    pub fn new(value: u32) -> Result<Self> {
        if value > MAX_FEE_TIER {
            return Err(Error::Config(format!(
                "fee tier {} does not fit in 24 bits",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Raw value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Big-endian 24-bit encoding
    pub fn to_be24(&self) -> [u8; 3] {
        let bytes = self.0.to_be_bytes();
        [bytes[1], bytes[2], bytes[3]]
    }
}

impl Default for FeeTier {
    fn default() -> Self {
        Self(500)
    }
}

impl TryFrom<u32> for FeeTier {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        FeeTier::new(value)
    }
}

impl From<FeeTier> for u32 {
    fn from(fee: FeeTier) -> Self {
        fee.0
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Swap direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sell the asset for the native settlement asset (`zeroForOne = true`)
    AssetToNative,
    /// Buy the asset with the native settlement asset (`zeroForOne = false`)
    NativeToAsset,
}

impl Direction {
    /// Map from the registry's `zeroForOne` flag
    pub fn from_zero_for_one(zero_for_one: bool) -> Self {
        if zero_for_one {
            Direction::AssetToNative
        } else {
            Direction::NativeToAsset
        }
    }

    /// The registry's `zeroForOne` flag
    pub fn zero_for_one(&self) -> bool {
        matches!(self, Direction::AssetToNative)
    }

    /// Whether the registry must be approved to pull the asset first
    pub fn requires_approval(&self) -> bool {
        matches!(self, Direction::AssetToNative)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AssetToNative => write!(f, "asset->native"),
            Direction::NativeToAsset => write!(f, "native->asset"),
        }
    }
}

/// One randomized trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Direction
    pub direction: Direction,
    /// Amount in (base units)
    pub amount: u128,
}

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Register the pool
    CreatePool,
    /// Allow the registry to pull the asset
    Approve,
    /// Seed reserves
    AddLiquidity,
    /// Exchange
    Swap,
}

impl Operation {
    /// Label used for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreatePool => "create-pool",
            Operation::Approve => "approve",
            Operation::AddLiquidity => "add-liquidity",
            Operation::Swap => "swap",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Initial nonce read
    Setup,
    /// Pool registration
    PoolCreation,
    /// Approval + add-liquidity
    LiquiditySeeding,
    /// Trade `index` (1-based)
    Trading {
        /// Trade index
        index: u32,
    },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Setup => write!(f, "setup"),
            Stage::PoolCreation => write!(f, "pool-creation"),
            Stage::LiquiditySeeding => write!(f, "liquidity-seeding"),
            Stage::Trading { index } => write!(f, "trading[{}]", index),
        }
    }
}

/// Orchestrator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Not started
    Idle,
    /// Registering the pool
    PoolCreation,
    /// Seeding reserves
    LiquiditySeeding,
    /// Executing trade `index`
    Trading {
        /// Trade index (1-based)
        index: u32,
    },
    /// All trades confirmed
    Done,
    /// Terminal failure
    Failed {
        /// Stage that failed
        stage: Stage,
        /// Failure reason
        reason: String,
    },
    /// Cancelled between steps
    Cancelled {
        /// Last stage that completed
        after: Option<Stage>,
    },
}

impl Phase {
    /// Whether the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Done | Phase::Failed { .. } | Phase::Cancelled { .. }
        )
    }
}

/// Outcome of one submitted (or attempted) transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Receipt observed with success status
    Confirmed(Receipt),
    /// Step failed
    Failed(StepError),
}

/// Record of one lifecycle step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Stage
    pub stage: Stage,
    /// Operation
    pub operation: Operation,
    /// Nonce the final attempt was signed with
    pub nonce: u64,
    /// Hash, once the node accepted the submission
    pub hash: Option<TxHash>,
    /// Outcome
    pub outcome: StepOutcome,
    /// Started at
    pub started_at: DateTime<Utc>,
    /// Finished at
    pub finished_at: DateTime<Utc>,
}

impl StepRecord {
    /// Receipt, when confirmed
    pub fn receipt(&self) -> Option<&Receipt> {
        match &self.outcome {
            StepOutcome::Confirmed(receipt) => Some(receipt),
            StepOutcome::Failed(_) => None,
        }
    }
}

/// Balances read before the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preflight {
    /// Sender's native balance (base units)
    pub native_balance: u128,
    /// Sender's asset balance (base units)
    pub asset_balance: u128,
    /// Whether both cover the liquidity seed
    pub covers_liquidity: bool,
}

/// How the run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Still running
    InProgress,
    /// All steps confirmed
    Completed,
    /// Stopped at a failing step
    Failed {
        /// Stage
        stage: Stage,
        /// Operation, when a transaction was attempted
        operation: Option<Operation>,
        /// Cause
        error: StepError,
    },
    /// Cancelled between steps
    Cancelled {
        /// Last stage that completed
        after: Option<Stage>,
    },
}

/// Ordered record of one simulation run
#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// Run id
    pub run_id: Uuid,
    /// Pool the run targets
    pub pool_id: PoolId,
    /// Nonce read from the node at start
    pub initial_nonce: Option<u64>,
    /// Next nonce after the last submission
    pub final_nonce: Option<u64>,
    /// Balances read before the run
    pub preflight: Option<Preflight>,
    /// Steps in submission order
    pub steps: Vec<StepRecord>,
    /// Outcome
    pub outcome: RunOutcome,
    /// Started at
    pub started_at: DateTime<Utc>,
    /// Finished at
    pub finished_at: Option<DateTime<Utc>>,
}

impl SimulationRun {
    /// Start a new run record
    pub fn new(pool_id: PoolId) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            pool_id,
            initial_nonce: None,
            final_nonce: None,
            preflight: None,
            steps: Vec::new(),
            outcome: RunOutcome::InProgress,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Receipts in confirmation order
    pub fn receipts(&self) -> impl Iterator<Item = &Receipt> {
        self.steps.iter().filter_map(StepRecord::receipt)
    }

    /// Operations that were confirmed, in order
    pub fn confirmed_operations(&self) -> Vec<Operation> {
        self.steps
            .iter()
            .filter(|step| step.receipt().is_some())
            .map(|step| step.operation)
            .collect()
    }

    /// Number of confirmed transactions
    pub fn confirmed_count(&self) -> usize {
        self.receipts().count()
    }

    /// Number of submissions the node accepted
    pub fn submitted_count(&self) -> usize {
        self.steps.iter().filter(|step| step.hash.is_some()).count()
    }

    /// Total gas used by confirmed transactions
    pub fn total_gas_used(&self) -> u64 {
        self.receipts().map(|receipt| receipt.gas_used).sum()
    }

    /// Whether every step confirmed
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Serializable summary for the progress log
    pub fn summary(&self) -> RunSummary {
        let outcome = match &self.outcome {
            RunOutcome::InProgress => "in-progress".to_string(),
            RunOutcome::Completed => "completed".to_string(),
            RunOutcome::Failed { stage, error, .. } => format!("failed at {}: {}", stage, error),
            RunOutcome::Cancelled { after: Some(stage) } => format!("cancelled after {}", stage),
            RunOutcome::Cancelled { after: None } => "cancelled before start".to_string(),
        };

        RunSummary {
            run_id: self.run_id,
            pool_id: self.pool_id.to_string(),
            outcome,
            submitted: self.submitted_count(),
            confirmed: self.confirmed_count(),
            total_gas_used: self.total_gas_used(),
            initial_nonce: self.initial_nonce,
            final_nonce: self.final_nonce,
            preflight: self.preflight,
            elapsed_ms: self
                .finished_at
                .map(|end| (end - self.started_at).num_milliseconds()),
        }
    }

    /// Convert into a `Result`, surfacing the failing stage and cause
    pub fn into_result(self) -> Result<Self> {
        match &self.outcome {
            RunOutcome::Completed => Ok(self),
            RunOutcome::Failed {
                stage,
                operation,
                error,
            } => Err(Error::Step {
                stage: *stage,
                operation: *operation,
                source: error.clone(),
            }),
            RunOutcome::Cancelled { after } => Err(Error::Cancelled(match after {
                Some(stage) => format!("after {}", stage),
                None => "before start".to_string(),
            })),
            RunOutcome::InProgress => Err(Error::Cancelled("while in progress".to_string())),
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Run id
    pub run_id: Uuid,
    /// Pool id (hex)
    pub pool_id: String,
    /// Outcome description
    pub outcome: String,
    /// Accepted submissions
    pub submitted: usize,
    /// Confirmed transactions
    pub confirmed: usize,
    /// Gas used
    pub total_gas_used: u64,
    /// Initial nonce
    pub initial_nonce: Option<u64>,
    /// Final nonce
    pub final_nonce: Option<u64>,
    /// Preflight balances
    pub preflight: Option<Preflight>,
    /// Wall-clock duration
    pub elapsed_ms: Option<i64>,
}

/// Render a base-unit amount in whole units for progress lines.
///
/// Falls back to the raw integer when it exceeds decimal precision.
pub fn display_amount(amount: u128, decimals: u32) -> String {
    i128::try_from(amount)
        .ok()
        .and_then(|value| Decimal::try_from_i128_with_scale(value, decimals).ok())
        .map(|value| value.normalize().to_string())
        .unwrap_or_else(|| amount.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_tier_bounds() {
        assert_eq!(FeeTier::new(500).unwrap().to_be24(), [0x00, 0x01, 0xf4]);
        assert!(FeeTier::new(MAX_FEE_TIER).is_ok());
        assert!(FeeTier::new(MAX_FEE_TIER + 1).is_err());
    }

    #[test]
    fn test_direction_flags() {
        assert!(Direction::AssetToNative.zero_for_one());
        assert!(Direction::AssetToNative.requires_approval());
        assert!(!Direction::NativeToAsset.zero_for_one());
        assert!(!Direction::NativeToAsset.requires_approval());
        assert_eq!(Direction::from_zero_for_one(true), Direction::AssetToNative);
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(150 * 10u128.pow(18), 18), "150");
        assert_eq!(display_amount(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(display_amount(42, 0), "42");
    }

    #[test]
    fn test_phase_terminal() {
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Trading { index: 1 }.is_terminal());
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Cancelled { after: None }.is_terminal());
    }

    #[test]
    fn test_cancelled_run_into_result() {
        let mut run = SimulationRun::new(PoolId::from_bytes([0; 32]));
        run.outcome = RunOutcome::Cancelled {
            after: Some(Stage::LiquiditySeeding),
        };
        assert!(matches!(run.into_result(), Err(Error::Cancelled(_))));
    }
}
