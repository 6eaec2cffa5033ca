//! Paced concurrent submission of the aggregated transactions.
//!
//! ```text
//! t=0        t=p        t=2p       ...
//!  │ spawn    │ spawn    │ spawn
//!  ▼          ▼          ▼
//! submit#0   submit#1   submit#2     (in flight concurrently, complete in any order)
//!     └──────────┴──────────┴──► StatsCounter
//! ```
//!
//! Pacing gates the *initiation* of each submission, never its completion: the
//! n-th spawn waits for `n` pacing intervals, not for earlier submissions.
//! The only exception is the in-flight bound: when `max_in_flight` submissions
//! are outstanding, the next spawn waits for a free slot.
//!
//! No submission is retried. The phase ends once every spawned unit has been
//! joined, at which point `success + failed == dispatched`.

use std::{sync::Arc, time::Duration};

use tokio::{sync::Semaphore, task::JoinSet, time::Instant};
use tracing::{debug, error};

use crate::ext::{classify_rpc_error, ChainClient, RpcErrorKind, SignedTransfer, StatsCounter};

/// Default pacing between submission initiations.
pub const DEFAULT_PACING: Duration = Duration::from_millis(10);

/// Default bound on concurrently outstanding submissions.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1024;

/// What the broadcast phase did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSummary {
    /// Submissions spawned (and joined)
    pub dispatched: usize,
    pub elapsed: Duration,
}

/// Submits transactions with a fixed interval between initiations.
#[derive(Debug, Clone, Copy)]
pub struct Broadcaster {
    pacing: Duration,
    max_in_flight: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl Broadcaster {
    pub fn new(pacing: Duration, max_in_flight: usize) -> Self {
        Self {
            pacing,
            max_in_flight: max_in_flight.clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Lower bound on the phase's wall-clock time for `count` transactions.
    pub fn min_duration(&self, count: usize) -> Duration {
        let waits = u32::try_from(count.saturating_sub(1)).unwrap_or(u32::MAX);
        self.pacing.saturating_mul(waits)
    }

    /// Submit every transfer in order, recording each outcome in `stats`.
    pub async fn broadcast<C>(
        &self,
        client: Arc<C>,
        transfers: Vec<SignedTransfer>,
        stats: Arc<StatsCounter>,
    ) -> BroadcastSummary
    where
        C: ChainClient + ?Sized + 'static,
    {
        let started = Instant::now();
        let slots = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;

        for (i, transfer) in transfers.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            // The semaphore is never closed, so acquisition only waits.
            let permit = Arc::clone(&slots).acquire_owned().await.ok();
            let client = Arc::clone(&client);
            let stats = Arc::clone(&stats);

            tasks.spawn(async move {
                let _permit = permit;
                submit_one(client.as_ref(), &transfer, &stats).await;
            });
            dispatched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                // A unit that died before reporting still counts once.
                error!(error = %e, "submission task failed");
                stats.record_failure(RpcErrorKind::Unknown).await;
            }
        }

        BroadcastSummary {
            dispatched,
            elapsed: started.elapsed(),
        }
    }
}

async fn submit_one<C>(client: &C, transfer: &SignedTransfer, stats: &StatsCounter)
where
    C: ChainClient + ?Sized,
{
    let from = transfer.from();
    let nonce = transfer.nonce();

    match client.submit(transfer).await {
        Ok(tx_hash) => {
            let tally = stats.record_success().await;
            debug!(%from, nonce, %tx_hash, "{}/{} transaction sent", tally.count, tally.total);
        }
        Err(e) => {
            let kind = classify_rpc_error(&e);
            let tally = stats.record_failure(kind).await;
            error!(%from, nonce, %kind, error = %e, "{}/{} failed to send transaction", tally.count, tally.total);
        }
    }
}
