//! Merges concurrently built batches into one submission order.
//!
//! Builders run in parallel and hand their finished batch to a shared
//! [`Aggregator`]. Insertion is serialized per wallet by the underlying map's
//! shard locks. The merged collection is only read after every builder has
//! finished.
//!
//! ## Ordering
//!
//! - Within a wallet: ascending nonce, exactly as built.
//! - Across wallets: ascending wallet index.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::ext::{SignedTransfer, TransactionBatch};

/// Shared sink for finished batches, keyed by wallet index.
#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    batches: Arc<DashMap<u32, TransactionBatch>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(DashMap::new()),
        }
    }

    /// Record a wallet's finished batch. Each wallet reports once per run.
    pub fn submit(&self, batch: TransactionBatch) {
        let index = batch.wallet_index();
        trace!(index, len = batch.len(), "aggregating batch");
        self.batches.insert(index, batch);
    }

    /// Number of wallets that reported a batch
    pub fn wallets(&self) -> usize {
        self.batches.len()
    }

    /// Total transfers collected so far
    pub fn len(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain every batch into one submission-ordered collection.
    ///
    /// Call only after all builders have finished.
    pub fn drain(&self) -> Vec<SignedTransfer> {
        let mut indices: Vec<u32> = self.batches.iter().map(|b| *b.key()).collect();
        indices.sort_unstable();

        indices
            .into_iter()
            .filter_map(|index| self.batches.remove(&index))
            .flat_map(|(_, batch)| batch.into_transfers())
            .collect()
    }
}
