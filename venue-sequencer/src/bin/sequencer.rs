use anyhow::Context;
use clap::Parser;
use node_client::{JsonRpcClient, KeyPairSigner, RpcClient, Signer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use venue_sequencer::{metrics, Config, Orchestrator, RandomTradeDriver, TradeSource};

/// Create a venue pool, seed it and run randomized swaps against a ledger node
///
/// Transactions are signed with the built-in ed25519 key-pair signer, whose
/// payload only nodes verifying that format accept. EVM nodes such as
/// Ganache or geth reject it; driving one requires linking a node-compatible
/// `Signer` in place of `KeyPairSigner`.
#[derive(Debug, Parser)]
#[command(name = "venue-sequencer", version, about)]
struct Args {
    /// TOML configuration file; defaults plus SEQUENCER_* variables when absent
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of trades (overrides configuration)
    #[arg(short, long)]
    trades: Option<u32>,

    /// RNG seed for a reproducible run (overrides configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(trades) = args.trades {
        config.trading.trade_count = trades;
    }
    if let Some(seed) = args.seed {
        config.trading.seed = Some(seed);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!("Venue sequencer starting...");

    let config = load_config(&args)?;
    info!(
        "Configuration loaded - node: {}, chain id: {}, pool fee tier: {}, trades: {}",
        config.node.endpoint,
        config.node.chain_id,
        config.assets.fee_tier,
        config.trading.trade_count
    );

    let credential = config
        .credential
        .source
        .fetch(&config.credential.name)
        .context("resolving signing credential")?;
    let signer = KeyPairSigner::from_credential(&credential)?;
    info!("Signing as {}", signer.address());

    let rpc: Arc<dyn RpcClient> = Arc::new(JsonRpcClient::new(config.node.rpc_config())?);

    let bounds = config.trading.bounds(&config.assets)?;
    let probability = config.trading.asset_to_native_probability;
    let trades: Box<dyn TradeSource> = match config.trading.seed {
        Some(seed) => {
            info!("Trade driver seeded with {}", seed);
            Box::new(RandomTradeDriver::seeded(seed, bounds, probability))
        }
        None => Box::new(RandomTradeDriver::from_entropy(bounds, probability)),
    };

    let cancel = CancellationToken::new();
    let mut orchestrator =
        Orchestrator::new(&config, rpc, Arc::new(signer), trades)?.with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            cancel.cancel();
        }
    });

    let run = orchestrator.run().await;
    let summary = run.summary();
    info!("Run summary: {}", serde_json::to_string(&summary)?);
    debug!("Metrics at exit:\n{}", metrics::gather_text());

    match run.into_result() {
        Ok(_) => {
            info!(
                "{} transactions confirmed, {} gas used",
                summary.confirmed, summary.total_gas_used
            );
            Ok(())
        }
        Err(e) => {
            error!("Run did not complete: {}", e);
            Err(e.into())
        }
    }
}
