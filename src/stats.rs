//! Success/failure accounting for the broadcast phase.
//!
//! [`StatsCounter`] is owned by the run and shared by reference with every
//! submission unit. Its only mutation paths are [`StatsCounter::record_success`]
//! and [`StatsCounter::record_failure`], both taken under one lock so a unit
//! always observes a consistent `(count, total)` pair for its log line.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use crate::ext::RpcErrorKind;

// ============================================================================
// RunStats
// ============================================================================

/// Final tally of a run's submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub success: u64,
    pub failed: u64,
    /// Failure breakdown by classified RPC error
    pub failures_by_kind: BTreeMap<RpcErrorKind, u64>,
}

impl RunStats {
    /// Submissions that reported an outcome
    pub fn total(&self) -> u64 {
        self.success + self.failed
    }

    pub fn failures_of(&self, kind: RpcErrorKind) -> u64 {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Position of one outcome within the running tally, e.g. "3/10".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Count of outcomes of the same kind so far, this one included
    pub count: u64,
    /// Outcomes of any kind so far, this one included
    pub total: u64,
}

// ============================================================================
// StatsCounter
// ============================================================================

/// Thread-safe accumulator of submission outcomes.
#[derive(Debug, Default)]
pub struct StatsCounter {
    inner: Mutex<RunStats>,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self) -> Tally {
        let mut stats = self.inner.lock().await;
        stats.success += 1;
        Tally {
            count: stats.success,
            total: stats.total(),
        }
    }

    pub async fn record_failure(&self, kind: RpcErrorKind) -> Tally {
        let mut stats = self.inner.lock().await;
        stats.failed += 1;
        *stats.failures_by_kind.entry(kind).or_insert(0) += 1;
        Tally {
            count: stats.failed,
            total: stats.total(),
        }
    }

    /// Current tally. Final only once every submission unit has been joined.
    pub async fn snapshot(&self) -> RunStats {
        self.inner.lock().await.clone()
    }

    pub fn into_stats(self) -> RunStats {
        self.inner.into_inner()
    }
}
