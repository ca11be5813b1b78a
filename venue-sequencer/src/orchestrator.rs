//! Lifecycle orchestrator
//!
//! Sequences pool creation, liquidity seeding and the trading run. One
//! transaction is in flight at a time and each step waits for its receipt.
//! A failed step stops the run where it is; nothing is rolled back.

use crate::bindings::{decode_uint, FungibleAsset, VenueRegistry};
use crate::builder::{Intent, TransactionBuilder};
use crate::config::Config;
use crate::driver::TradeSource;
use crate::error::{Result, StepError};
use crate::metrics::{
    SEQUENCER_CURRENT_NONCE, SEQUENCER_NONCE_RESYNCS_TOTAL, SEQUENCER_RECEIPT_WAIT_SECONDS,
    SEQUENCER_TRANSACTIONS_TOTAL, STATUS_CONFIRMED, STATUS_FAILED,
};
use crate::nonce::NonceCounter;
use crate::pool::{PoolId, PoolKey};
use crate::types::*;
use crate::SWAP_MIN_AMOUNT_OUT;
use chrono::Utc;
use node_client::{Address, Receipt, RpcClient, Signer, TxHash};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Amounts and timings fixed for the whole run
#[derive(Debug, Clone, Copy)]
struct RunPlan {
    trade_count: u32,
    liquidity_asset: u128,
    liquidity_native: u128,
    trade_delay: Duration,
    confirmation_timeout: Duration,
    asset_decimals: u32,
    native_decimals: u32,
}

/// Why `drive` stopped early
enum Halt {
    Failed {
        stage: Stage,
        operation: Option<Operation>,
        error: StepError,
    },
    Cancelled {
        after: Option<Stage>,
    },
}

/// Drives one venue through its lifecycle
pub struct Orchestrator {
    rpc: Arc<dyn RpcClient>,
    signer: Arc<dyn Signer>,
    trades: Box<dyn TradeSource>,
    builder: TransactionBuilder,
    registry: VenueRegistry,
    asset: FungibleAsset,
    pool: PoolKey,
    pool_id: PoolId,
    plan: RunPlan,
    nonce: Option<NonceCounter>,
    phase: Phase,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create new orchestrator from a validated configuration
    pub fn new(
        config: &Config,
        rpc: Arc<dyn RpcClient>,
        signer: Arc<dyn Signer>,
        trades: Box<dyn TradeSource>,
    ) -> Result<Self> {
        config.validate()?;

        let (liquidity_asset, liquidity_native) = config.liquidity.amounts(&config.assets)?;
        let pool = config.assets.pool_key();
        let builder = TransactionBuilder::new(
            signer.address(),
            config.node.chain_id,
            config.gas.limits,
            config.gas.price,
        );

        Ok(Self {
            rpc,
            signer,
            trades,
            builder,
            registry: VenueRegistry::new(config.assets.registry),
            asset: FungibleAsset::new(config.assets.asset),
            pool,
            pool_id: pool.id(),
            plan: RunPlan {
                trade_count: config.trading.trade_count,
                liquidity_asset,
                liquidity_native,
                trade_delay: Duration::from_millis(config.trading.delay_ms),
                confirmation_timeout: Duration::from_secs(config.confirmation_timeout_seconds),
                asset_decimals: config.assets.asset_decimals,
                native_decimals: config.assets.native_decimals,
            },
            nonce: None,
            phase: Phase::Idle,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this run between steps
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current phase
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Nonce counter, once read from the node
    pub fn nonce(&self) -> Option<&NonceCounter> {
        self.nonce.as_ref()
    }

    /// Pool this orchestrator creates and trades against
    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Execute the full lifecycle and return the run record.
    ///
    /// Calling this again starts over from `Idle` with a fresh nonce read.
    pub async fn run(&mut self) -> SimulationRun {
        let mut run = SimulationRun::new(self.pool_id);
        self.phase = Phase::Idle;
        self.nonce = None;

        info!(
            "Starting run {} for pool {} ({} trades, sender {})",
            run.run_id,
            self.pool_id,
            self.plan.trade_count,
            self.builder.sender()
        );

        match self.drive(&mut run).await {
            Ok(()) => {
                self.phase = Phase::Done;
                run.outcome = RunOutcome::Completed;
                info!("Run {} completed", run.run_id);
            }
            Err(Halt::Failed {
                stage,
                operation,
                error,
            }) => {
                error!("Run {} failed in {}: {}", run.run_id, stage, error);
                self.phase = Phase::Failed {
                    stage,
                    reason: error.to_string(),
                };
                run.outcome = RunOutcome::Failed {
                    stage,
                    operation,
                    error,
                };
            }
            Err(Halt::Cancelled { after }) => {
                warn!("Run {} cancelled", run.run_id);
                self.phase = Phase::Cancelled { after };
                run.outcome = RunOutcome::Cancelled { after };
            }
        }

        run.final_nonce = self.nonce.as_ref().map(NonceCounter::current);
        run.finished_at = Some(Utc::now());
        run
    }

    async fn drive(&mut self, run: &mut SimulationRun) -> std::result::Result<(), Halt> {
        self.checkpoint(None)?;
        self.setup(run).await?;

        self.checkpoint(Some(Stage::Setup))?;
        self.phase = Phase::PoolCreation;
        self.create_pool(run).await?;

        self.checkpoint(Some(Stage::PoolCreation))?;
        self.phase = Phase::LiquiditySeeding;
        self.seed_liquidity(run).await?;

        let mut last = Stage::LiquiditySeeding;
        for index in 1..=self.plan.trade_count {
            self.checkpoint(Some(last))?;
            self.phase = Phase::Trading { index };
            self.trade(run, index).await?;
            last = Stage::Trading { index };

            if index < self.plan.trade_count {
                self.pace(last).await?;
            }
        }

        Ok(())
    }

    fn checkpoint(&self, after: Option<Stage>) -> std::result::Result<(), Halt> {
        if self.cancel.is_cancelled() {
            return Err(Halt::Cancelled { after });
        }
        Ok(())
    }

    async fn pace(&self, after: Stage) -> std::result::Result<(), Halt> {
        if self.plan.trade_delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Halt::Cancelled { after: Some(after) }),
            _ = tokio::time::sleep(self.plan.trade_delay) => Ok(()),
        }
    }

    async fn setup(&mut self, run: &mut SimulationRun) -> std::result::Result<(), Halt> {
        let sender = self.builder.sender();

        let initial = self.rpc.nonce(sender).await.map_err(|e| Halt::Failed {
            stage: Stage::Setup,
            operation: None,
            error: e.into(),
        })?;
        info!("Sender {} starts at nonce {}", sender, initial);

        self.nonce = Some(NonceCounter::new(initial));
        run.initial_nonce = Some(initial);
        SEQUENCER_CURRENT_NONCE.set(gauge_value(initial));

        run.preflight = self.preflight(sender).await;
        Ok(())
    }

    /// Read balances; a shortfall or read failure is only logged
    async fn preflight(&self, sender: Address) -> Option<Preflight> {
        let native_balance = match self.rpc.balance(sender).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Preflight: native balance unavailable: {}", e);
                return None;
            }
        };

        let call = self.asset.balance_of(sender);
        let asset_balance = match self.rpc.call(self.asset.address(), &call).await {
            Ok(output) => match decode_uint(&output) {
                Ok(balance) => balance,
                Err(e) => {
                    warn!("Preflight: {}", e);
                    return None;
                }
            },
            Err(e) => {
                warn!("Preflight: asset balance unavailable: {}", e);
                return None;
            }
        };

        let covers_liquidity = native_balance >= self.plan.liquidity_native
            && asset_balance >= self.plan.liquidity_asset;

        info!(
            "Preflight: native {} / asset {}",
            display_amount(native_balance, self.plan.native_decimals),
            display_amount(asset_balance, self.plan.asset_decimals)
        );
        if !covers_liquidity {
            warn!(
                "Preflight: balances do not cover the liquidity seed ({} asset, {} native)",
                display_amount(self.plan.liquidity_asset, self.plan.asset_decimals),
                display_amount(self.plan.liquidity_native, self.plan.native_decimals)
            );
        }

        Some(Preflight {
            native_balance,
            asset_balance,
            covers_liquidity,
        })
    }

    async fn create_pool(&mut self, run: &mut SimulationRun) -> std::result::Result<(), Halt> {
        let intent = Intent::new(
            Operation::CreatePool,
            self.registry.address(),
            self.registry.create_pool(&self.pool),
        );
        self.execute(run, Stage::PoolCreation, intent).await?;
        info!("Pool {} created (fee tier {})", self.pool_id, self.pool.fee);
        Ok(())
    }

    async fn seed_liquidity(&mut self, run: &mut SimulationRun) -> std::result::Result<(), Halt> {
        let stage = Stage::LiquiditySeeding;
        let registry = self.registry.address();

        let approve = Intent::new(
            Operation::Approve,
            self.asset.address(),
            self.asset.approve(registry, self.plan.liquidity_asset),
        );
        self.execute(run, stage, approve).await?;

        let add = Intent::new(
            Operation::AddLiquidity,
            registry,
            self.registry.add_liquidity(
                self.pool_id,
                self.plan.liquidity_asset,
                self.plan.liquidity_native,
            ),
        )
        .with_value(self.plan.liquidity_native);
        self.execute(run, stage, add).await?;

        info!(
            "Liquidity seeded: {} asset, {} native",
            display_amount(self.plan.liquidity_asset, self.plan.asset_decimals),
            display_amount(self.plan.liquidity_native, self.plan.native_decimals)
        );
        Ok(())
    }

    async fn trade(&mut self, run: &mut SimulationRun, index: u32) -> std::result::Result<(), Halt> {
        let stage = Stage::Trading { index };
        let trade = self.trades.next_trade().ok_or(Halt::Failed {
            stage,
            operation: None,
            error: StepError::TradeSourceExhausted { index },
        })?;

        info!(
            "Trade {}/{}: {} {}",
            index,
            self.plan.trade_count,
            trade.direction,
            display_amount(trade.amount, self.plan.asset_decimals)
        );

        let registry = self.registry.address();
        if trade.direction.requires_approval() {
            let approve = Intent::new(
                Operation::Approve,
                self.asset.address(),
                self.asset.approve(registry, trade.amount),
            );
            self.execute(run, stage, approve).await?;
        }

        let value = match trade.direction {
            Direction::NativeToAsset => trade.amount,
            Direction::AssetToNative => 0,
        };
        let swap = Intent::new(
            Operation::Swap,
            registry,
            self.registry.swap(
                self.pool_id,
                trade.direction.zero_for_one(),
                trade.amount,
                SWAP_MIN_AMOUNT_OUT,
            ),
        )
        .with_value(value);
        self.execute(run, stage, swap).await?;

        Ok(())
    }

    /// Submit one intent, wait for its receipt and record the step
    async fn execute(
        &mut self,
        run: &mut SimulationRun,
        stage: Stage,
        intent: Intent,
    ) -> std::result::Result<Receipt, Halt> {
        let operation = intent.operation;
        let started_at = Utc::now();
        let (nonce, hash, result) = self.submit_and_confirm(&intent).await;
        let finished_at = Utc::now();

        if let Some(counter) = &self.nonce {
            SEQUENCER_CURRENT_NONCE.set(gauge_value(counter.current()));
        }

        let result = match result {
            Err(StepError::Reverted { hash }) if operation == Operation::CreatePool => {
                Err(self.explain_create_pool_revert(&intent, hash).await)
            }
            other => other.map_err(|error| classify(operation, error)),
        };
        let (outcome, status) = match &result {
            Ok(receipt) => {
                info!(
                    "[{}] {} confirmed: nonce={} hash={} block={} gas_used={}",
                    stage,
                    operation,
                    nonce,
                    receipt.transaction_hash,
                    receipt.block_number,
                    receipt.gas_used
                );
                (StepOutcome::Confirmed(receipt.clone()), STATUS_CONFIRMED)
            }
            Err(error) => {
                error!("[{}] {} failed: nonce={} {}", stage, operation, nonce, error);
                (StepOutcome::Failed(error.clone()), STATUS_FAILED)
            }
        };

        SEQUENCER_TRANSACTIONS_TOTAL
            .with_label_values(&[operation.as_str(), status])
            .inc();

        run.steps.push(StepRecord {
            stage,
            operation,
            nonce,
            hash,
            outcome,
            started_at,
            finished_at,
        });

        result.map_err(|error| Halt::Failed {
            stage,
            operation: Some(operation),
            error,
        })
    }

    /// A mined create-pool receipt carries no reason, so replay the call
    /// against current state to see whether the pool was already there.
    async fn explain_create_pool_revert(&self, intent: &Intent, hash: TxHash) -> StepError {
        match self.rpc.call(intent.to, &intent.data).await {
            Err(node_client::Error::Rpc { message, .. }) if names_existing_pool(&message) => {
                StepError::PoolAlreadyExists(format!("{} reverted: {}", hash, message))
            }
            Err(e) => {
                debug!("Replay of reverted {} gave no pool reason: {}", hash, e);
                StepError::Reverted { hash }
            }
            Ok(_) => StepError::Reverted { hash },
        }
    }

    /// Build, sign and submit with one nonce resync, then await the receipt.
    ///
    /// Returns the nonce of the final attempt and the hash once accepted.
    async fn submit_and_confirm(
        &mut self,
        intent: &Intent,
    ) -> (u64, Option<TxHash>, std::result::Result<Receipt, StepError>) {
        let Some(counter) = self.nonce.as_mut() else {
            return (
                0,
                None,
                Err(StepError::Node("nonce not initialised".to_string())),
            );
        };

        let gas_price = match self.builder.resolve_gas_price(self.rpc.as_ref()).await {
            Ok(price) => price,
            Err(e) => return (counter.current(), None, Err(e.into())),
        };

        let mut resynced = false;
        let (nonce, hash) = loop {
            let nonce = counter.current();
            let unsigned = self.builder.build(intent, nonce, gas_price);
            let signed = match self.signer.sign(&unsigned) {
                Ok(signed) => signed,
                Err(e) => return (nonce, None, Err(e.into())),
            };

            match self.rpc.submit(&signed).await {
                Ok(hash) => {
                    counter.advance();
                    break (nonce, hash);
                }
                Err(e) if e.is_nonce_mismatch() && !resynced => {
                    resynced = true;
                    SEQUENCER_NONCE_RESYNCS_TOTAL.inc();
                    warn!("{} rejected at nonce {}: {}; resyncing", intent.operation, nonce, e);

                    match self.rpc.nonce(self.builder.sender()).await {
                        Ok(reported) => {
                            counter.resync(reported);
                        }
                        Err(e) => return (nonce, None, Err(e.into())),
                    }
                }
                Err(e) => return (nonce, None, Err(e.into())),
            }
        };

        let waited = Instant::now();
        let result = match self
            .rpc
            .await_receipt(hash, self.plan.confirmation_timeout)
            .await
        {
            Ok(receipt) if receipt.success => Ok(receipt),
            Ok(_) => Err(StepError::Reverted { hash }),
            Err(e) => Err(e.into()),
        };
        SEQUENCER_RECEIPT_WAIT_SECONDS
            .with_label_values(&[intent.operation.as_str()])
            .observe(waited.elapsed().as_secs_f64());

        (nonce, Some(hash), result)
    }
}

/// Promote a create-pool rejection naming an existing pool
fn classify(operation: Operation, error: StepError) -> StepError {
    match error {
        StepError::Rejected(reason)
            if operation == Operation::CreatePool && names_existing_pool(&reason) =>
        {
            StepError::PoolAlreadyExists(reason)
        }
        other => other,
    }
}

fn names_existing_pool(reason: &str) -> bool {
    reason.to_lowercase().contains("already exist")
}

fn gauge_value(nonce: u64) -> i64 {
    i64::try_from(nonce).unwrap_or(i64::MAX)
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("endpoint", &self.rpc.endpoint())
            .field("sender", &self.builder.sender())
            .field("pool_id", &self.pool_id)
            .field("phase", &self.phase)
            .field("nonce", &self.nonce)
            .finish()
    }
}
