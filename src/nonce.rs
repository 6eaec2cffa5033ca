//! Contiguous nonce assignment for one wallet's batch.
//!
//! A wallet's pending nonce is read once per run. Every transaction of the
//! batch then takes the next value of a [`NonceRange`], which yields
//! `[start, start + len)` with no gaps and no repeats.
//!
//! ```text
//!   pending_nonce() ──► NonceRange { start, len }
//!                            │
//!                            ▼
//!             start, start+1, ..., start+len-1
//! ```

use std::ops::Range;

use alloy::{primitives::Address, transports::TransportResult};
use tracing::{trace, warn};

use crate::ext::ChainClient;

/// Half-open range of nonces reserved for one wallet's batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    start: u64,
    len: u64,
}

impl NonceRange {
    pub fn new(start: u64, len: u64) -> Self {
        Self { start, len }
    }

    /// Read `address`'s pending nonce and reserve `len` nonces from it.
    pub async fn fetch<C>(client: &C, address: Address, len: u64) -> TransportResult<Self>
    where
        C: ChainClient + ?Sized,
    {
        let start = client.pending_nonce(address).await?;
        if start.checked_add(len).is_none() {
            warn!(%address, start, len, "nonce range truncated at u64::MAX");
        }
        trace!(%address, start, len, "reserved nonce range");
        Ok(Self::new(start, len))
    }

    /// First nonce of the range
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last nonce of the range
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.len)
    }

    pub fn len(&self) -> u64 {
        self.end() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, nonce: u64) -> bool {
        self.as_range().contains(&nonce)
    }

    pub fn as_range(&self) -> Range<u64> {
        self.start..self.end()
    }
}

impl IntoIterator for NonceRange {
    type Item = u64;
    type IntoIter = Range<u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_range()
    }
}

/// Check that `nonces` is strictly increasing by one.
pub fn is_contiguous(nonces: &[u64]) -> bool {
    nonces.windows(2).all(|w| w[1] == w[0] + 1)
}
