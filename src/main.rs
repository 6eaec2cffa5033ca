//! `icarus`: build and broadcast self-transfers from many wallets at once.
//!
//! ```sh
//! icarus --rpc-url http://localhost:8545 \
//!     --mnemonic "test test test test test test test test test test test junk" \
//!     --wallets 10 --txns 1000 --wait 5
//! ```

use std::{process::ExitCode, time::Duration};

use clap::Parser;
use icarus::ext::{RpcConnector, RunConfig, TxManager};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "icarus", version)]
#[command(about = "Concurrent multi-wallet transaction builder and paced broadcaster", long_about = None)]
struct Cli {
    /// BIP-39 seed phrase the wallets are derived from
    #[arg(long, env = "ICARUS_MNEMONIC", hide_env_values = true)]
    mnemonic: String,

    /// JSON-RPC endpoint (http, ws or ipc)
    #[arg(long, env = "ICARUS_RPC_URL")]
    rpc_url: String,

    /// Number of wallets to derive
    #[arg(long, default_value_t = 10)]
    wallets: u32,

    /// Total number of transactions; split evenly across wallets
    #[arg(long, default_value_t = 100)]
    txns: u64,

    /// Milliseconds to wait between submission initiations
    #[arg(long, default_value_t = 10)]
    wait: u64,

    /// Default log level; RUST_LOG overrides it
    #[arg(long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,

    /// Chain ID used when the endpoint cannot report one
    #[arg(long, default_value_t = 1)]
    chain_id: u64,

    /// Maximum submissions in flight at once
    #[arg(long, default_value_t = 1024)]
    max_in_flight: usize,

    /// Maximum batch builders running at once
    #[arg(long, default_value_t = 64)]
    max_builders: usize,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig::new(&self.rpc_url, &self.mnemonic)
            .with_wallets(self.wallets)
            .with_tx_count(self.txns)
            .with_pacing(Duration::from_millis(self.wait))
            .with_fallback_chain_id(self.chain_id)
            .with_max_in_flight(self.max_in_flight)
            .with_max_concurrent_builders(self.max_builders)
    }
}

/// Install the fmt subscriber. `RUST_LOG` takes precedence over `log_level`.
fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let config = cli.run_config();
    info!(
        rpc_url = %config.rpc_url,
        wallets = config.wallets,
        txns = config.tx_count,
        batch_size = config.batch_size(),
        wait_ms = cli.wait,
        "starting run"
    );

    let mut manager = TxManager::new(config, RpcConnector);
    match manager.run().await {
        Ok(report) => {
            info!(
                success = report.stats.success,
                failed = report.stats.failed,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, phase = %manager.phase(), "run failed");
            ExitCode::FAILURE
        }
    }
}
