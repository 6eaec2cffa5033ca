//! Run orchestration.
//!
//! [`TxManager`] drives one run through its phases:
//!
//! ```text
//! Idle ─► WalletsDerived ─► FeesComputed ─► BatchesBuilding ─► BatchesAggregated ─► Broadcasting ─► Complete
//!   │            │                │
//!   └────────────┴────────────────┴──────────────────────────► Aborted
//! ```
//!
//! Transitions are strictly sequential. `BatchesBuilding` fans out to one
//! builder per wallet (bounded by `max_concurrent_builders`) and does not
//! advance until every builder has finished. There is no retry transition:
//! a failed dial, invalid configuration or missing fee data ends the run in
//! `Aborted` and the error is returned to the caller.
//!
//! A failed chain-ID fetch is not fatal. The run continues with the
//! configured fallback chain ID.

use std::{fmt, sync::Arc, time::Duration};

use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use tracing::{error, info, warn};

use crate::ext::{
    Aggregator, BatchBuilder, ChainClient, ChainConnector, RunConfig, RunError, RunStats,
    StatsCounter, WalletSet,
};

// ============================================================================
// RunPhase
// ============================================================================

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    WalletsDerived,
    FeesComputed,
    BatchesBuilding,
    BatchesAggregated,
    Broadcasting,
    Complete,
    Aborted,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::WalletsDerived => "wallets_derived",
            RunPhase::FeesComputed => "fees_computed",
            RunPhase::BatchesBuilding => "batches_building",
            RunPhase::BatchesAggregated => "batches_aggregated",
            RunPhase::Broadcasting => "broadcasting",
            RunPhase::Complete => "complete",
            RunPhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Aborted)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RunReport
// ============================================================================

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub phase: RunPhase,
    pub stats: RunStats,
    /// Transactions that reached the submission stage
    pub built: u64,
    /// Transactions planned: `batch_size * wallets`
    pub requested: u64,
    pub elapsed: Duration,
}

impl RunReport {
    /// Every built transaction reported an outcome.
    pub fn is_accounted(&self) -> bool {
        self.stats.total() == self.built
    }
}

// ============================================================================
// TxManager
// ============================================================================

/// Orchestrates one run against the endpoint reached through `Conn`.
pub struct TxManager<Conn> {
    config: RunConfig,
    connector: Conn,
    phase: RunPhase,
}

impl<Conn: ChainConnector> TxManager<Conn> {
    pub fn new(config: RunConfig, connector: Conn) -> Self {
        Self {
            config,
            connector,
            phase: RunPhase::Idle,
        }
    }

    /// Current phase. `Complete` or `Aborted` once [`TxManager::run`] returns.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Execute the run to completion.
    ///
    /// Per-transaction failures never surface here; they are counted in the
    /// report's stats. An `Err` means the run was aborted.
    pub async fn run(&mut self) -> Result<RunReport, RunError> {
        match self.execute().await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(phase = %self.phase, error = %e, fatal = e.is_fatal(), "run aborted");
                self.phase = RunPhase::Aborted;
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: RunPhase) {
        info!(from = %self.phase, to = %next, "run phase");
        self.phase = next;
    }

    async fn execute(&mut self) -> Result<RunReport, RunError> {
        let started = Instant::now();
        self.config.validate()?;

        let client = self
            .connector
            .dial(&self.config.rpc_url, self.config.connect_timeout)
            .await?;
        let client = Arc::new(client);

        let chain_id = match tokio::time::timeout(self.config.connect_timeout, client.chain_id()).await {
            Ok(Ok(chain_id)) => chain_id,
            Ok(Err(e)) => {
                warn!(
                    error = %e,
                    fallback = self.config.fallback_chain_id,
                    "failed to get chain id; signatures are bound to the fallback chain"
                );
                self.config.fallback_chain_id
            }
            Err(_) => {
                warn!(
                    fallback = self.config.fallback_chain_id,
                    "timed out fetching chain id; signatures are bound to the fallback chain"
                );
                self.config.fallback_chain_id
            }
        };

        let wallets =
            WalletSet::derive(&self.config.mnemonic, self.config.wallets)?.with_chain_id(chain_id);
        self.transition(RunPhase::WalletsDerived);

        // Wallet count was validated above, so the set is never empty.
        let representative = wallets
            .get(0)
            .map(|w| w.address())
            .ok_or_else(|| RunError::Config("no wallets derived".into()))?;
        let fees = self
            .config
            .fee_advisor()
            .compute(client.as_ref(), representative)
            .await?;
        self.transition(RunPhase::FeesComputed);

        let batch_size = self.config.batch_size();
        let requested = self.config.planned_transactions();
        info!(chain_id, wallets = wallets.len(), batch_size, requested, "building batches");
        self.transition(RunPhase::BatchesBuilding);

        let builder = BatchBuilder::new(chain_id, fees, batch_size, self.config.transfer_value);
        let aggregator = self.build_batches(&client, builder, wallets).await;
        self.transition(RunPhase::BatchesAggregated);

        let reported = aggregator.wallets();
        let transfers = aggregator.drain();
        let built = transfers.len() as u64;
        info!(built, requested, wallets = reported, "batches aggregated");

        self.transition(RunPhase::Broadcasting);
        let stats = Arc::new(StatsCounter::new());
        let broadcaster = self.config.broadcaster();
        let summary = broadcaster
            .broadcast(Arc::clone(&client), transfers, Arc::clone(&stats))
            .await;
        let stats = stats.snapshot().await;

        self.transition(RunPhase::Complete);
        info!(
            success = stats.success,
            failed = stats.failed,
            built,
            requested,
            broadcast_secs = summary.elapsed.as_secs_f64(),
            failures = ?stats.failures_by_kind,
            "run complete"
        );

        Ok(RunReport {
            phase: self.phase,
            stats,
            built,
            requested,
            elapsed: started.elapsed(),
        })
    }

    /// Build every wallet's batch concurrently and wait for all of them.
    async fn build_batches(
        &self,
        client: &Arc<Conn::Client>,
        builder: BatchBuilder,
        wallets: WalletSet,
    ) -> Aggregator {
        let aggregator = Aggregator::new();
        let permits = self.config.max_concurrent_builders.clamp(1, Semaphore::MAX_PERMITS);
        let slots = Arc::new(Semaphore::new(permits));
        let mut tasks = JoinSet::new();

        for wallet in wallets {
            let permit = Arc::clone(&slots).acquire_owned().await.ok();
            let client = Arc::clone(client);
            let aggregator = aggregator.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let batch = builder.build(client.as_ref(), &wallet).await;
                aggregator.submit(batch);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "batch builder failed");
            }
        }

        aggregator
    }
}

/// Run once with an already constructed client, skipping the dial.
pub async fn run_with_client<C>(config: RunConfig, client: C) -> Result<RunReport, RunError>
where
    C: ChainClient + Clone + 'static,
{
    TxManager::new(config, crate::ext::PreparedConnector::new(client))
        .run()
        .await
}
