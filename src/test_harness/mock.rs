//! Scripted in-memory chain used by unit and scenario tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy::{
    consensus::Transaction,
    primitives::{Address, B256, U256},
    rpc::types::TransactionRequest,
    transports::{TransportErrorKind, TransportResult},
};
use async_trait::async_trait;

use crate::ext::{ChainClient, ChainConnector, RunError, SignedTransfer};

/// One submission seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub from: Address,
    pub nonce: u64,
    pub chain_id: Option<u64>,
    pub hash: B256,
}

// ============================================================================
// MockChainClient
// ============================================================================

/// Chain client with scripted responses.
///
/// Clones share the submission log, so a test can keep one handle while the
/// run owns another.
#[derive(Debug, Clone)]
pub struct MockChainClient {
    chain_id: Option<u64>,
    nonces: HashMap<Address, u64>,
    failing_nonces: HashSet<Address>,
    base_fee: Option<u128>,
    tip: u128,
    gas_estimate: Option<u64>,
    balance: Option<U256>,
    submit_error: Option<String>,
    fail_every: Option<usize>,
    submit_delay: Duration,
    attempts: Arc<AtomicUsize>,
    submitted: Arc<Mutex<Vec<Submission>>>,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self {
            chain_id: Some(31337),
            nonces: HashMap::new(),
            failing_nonces: HashSet::new(),
            base_fee: Some(1_000_000_000),
            tip: 100_000_000,
            gas_estimate: Some(21_000),
            balance: Some(U256::from(10u128.pow(18))),
            submit_error: None,
            fail_every: None,
            submit_delay: Duration::ZERO,
            attempts: Arc::new(AtomicUsize::new(0)),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn fail_chain_id(mut self) -> Self {
        self.chain_id = None;
        self
    }

    pub fn with_nonce(mut self, address: Address, nonce: u64) -> Self {
        self.nonces.insert(address, nonce);
        self
    }

    pub fn fail_nonce_for(mut self, address: Address) -> Self {
        self.failing_nonces.insert(address);
        self
    }

    pub fn with_base_fee(mut self, base_fee: Option<u128>) -> Self {
        self.base_fee = base_fee;
        self
    }

    pub fn with_tip(mut self, tip: u128) -> Self {
        self.tip = tip;
        self
    }

    pub fn with_gas_estimate(mut self, gas: u64) -> Self {
        self.gas_estimate = Some(gas);
        self
    }

    pub fn fail_gas_estimation(mut self) -> Self {
        self.gas_estimate = None;
        self
    }

    pub fn fail_balance(mut self) -> Self {
        self.balance = None;
        self
    }

    /// Reject every submission with `message`.
    pub fn fail_submissions(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    /// Reject every `n`-th submission attempt (1-based) with "nonce too low".
    pub fn fail_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Submission attempts, failed ones included
    pub fn submissions(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Submission> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_chain_ids(&self) -> Vec<u64> {
        self.submitted().iter().filter_map(|s| s.chain_id).collect()
    }

    /// Nonces submitted by `from`, in initiation order.
    pub fn submitted_nonces(&self, from: Address) -> Vec<u64> {
        self.submitted()
            .iter()
            .filter(|s| s.from == from)
            .map(|s| s.nonce)
            .collect()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn chain_id(&self) -> TransportResult<u64> {
        self.chain_id
            .ok_or_else(|| TransportErrorKind::custom_str("eth_chainId unavailable"))
    }

    async fn pending_nonce(&self, address: Address) -> TransportResult<u64> {
        if self.failing_nonces.contains(&address) {
            return Err(TransportErrorKind::custom_str("connection reset by peer"));
        }
        Ok(self.nonces.get(&address).copied().unwrap_or(0))
    }

    async fn estimate_gas(&self, _request: TransactionRequest) -> TransportResult<u64> {
        self.gas_estimate
            .ok_or_else(|| TransportErrorKind::custom_str("execution reverted"))
    }

    async fn suggested_tip(&self) -> TransportResult<u128> {
        Ok(self.tip)
    }

    async fn latest_base_fee(&self) -> TransportResult<Option<u128>> {
        Ok(self.base_fee)
    }

    async fn balance_at(&self, _address: Address) -> TransportResult<U256> {
        self.balance
            .ok_or_else(|| TransportErrorKind::custom_str("balance unavailable"))
    }

    async fn submit(&self, tx: &SignedTransfer) -> TransportResult<B256> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted.lock().unwrap().push(Submission {
            from: tx.from(),
            nonce: tx.nonce(),
            chain_id: tx.envelope().chain_id(),
            hash: tx.hash(),
        });

        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        if let Some(message) = &self.submit_error {
            return Err(TransportErrorKind::custom_str(message));
        }
        if self.fail_every.is_some_and(|n| attempt % n == 0) {
            return Err(TransportErrorKind::custom_str("nonce too low"));
        }
        Ok(tx.hash())
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Connector that hands out a [`MockChainClient`] or refuses to connect.
#[derive(Debug, Clone)]
pub struct MockConnector {
    client: MockChainClient,
    refuse: bool,
    dials: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new(client: MockChainClient) -> Self {
        Self {
            client,
            refuse: false,
            dials: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Connector whose every dial fails.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(MockChainClient::new())
        }
    }

    pub fn client(&self) -> &MockChainClient {
        &self.client
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainConnector for MockConnector {
    type Client = MockChainClient;

    async fn dial(&self, endpoint: &str, _timeout: Duration) -> Result<MockChainClient, RunError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(RunError::Connection {
                endpoint: endpoint.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(self.client.clone())
    }
}
