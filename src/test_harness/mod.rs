//! Test harness for run-level scenarios.
//!
//! Two backends:
//!
//! - [`MockChainClient`] / [`MockConnector`]: scripted in-memory chain for
//!   deterministic tests of every phase and failure mode.
//! - [`AnvilTestHarness`]: a real Anvil node for end-to-end runs. Tests using
//!   it are `#[ignore]`d because they need the `anvil` binary on `PATH`.
//!
//! # Example
//!
//! ```ignore
//! #[tokio::test]
//! #[ignore = "requires anvil"]
//! async fn test_run_against_anvil() {
//!     let harness = AnvilTestHarness::new().await.unwrap();
//!     let report = harness.run(2, 10).await.unwrap();
//!     assert_eq!(report.stats.success, 10);
//! }
//! ```

mod mock;

pub use mock::*;
pub use scenario::*;

use std::time::Duration;

use alloy::{
    network::Ethereum,
    node_bindings::{Anvil, AnvilInstance},
    primitives::{Address, U256},
    providers::{ext::AnvilApi, Provider, RootProvider},
};
use anyhow::Result;

use crate::ext::{
    BatchBuilder, ChainConnector, FeeParameters, PreparedConnector, RpcChainClient, RpcConnector,
    RunConfig, RunReport, SignedTransfer, TxManager, WalletSet,
};

/// Well-known development phrase. Anvil funds its first accounts from it.
pub const TEST_PHRASE: &str = "test test test test test test test test test test test junk";

/// Signed transfers for `wallets` wallets with `per_wallet` nonces each,
/// ordered wallet by wallet.
pub fn sample_transfers(wallets: u32, per_wallet: u64) -> Vec<SignedTransfer> {
    let set = WalletSet::derive(TEST_PHRASE, wallets).unwrap();
    let builder = BatchBuilder::new(
        31337,
        FeeParameters::from_base_fee(1_000_000_000, 100_000_000, 21_000),
        per_wallet,
        U256::from(10_000u64),
    );

    set.iter()
        .flat_map(|wallet| {
            (0..per_wallet).map(move |nonce| {
                let envelope = wallet.sign(builder.template(wallet.address(), nonce)).unwrap();
                SignedTransfer::new(wallet.index(), wallet.address(), nonce, envelope)
            })
        })
        .collect()
}

// ============================================================================
// AnvilTestHarness
// ============================================================================

/// Test harness running full orchestration against a local Anvil node.
pub struct AnvilTestHarness {
    /// The Anvil instance
    instance: AnvilInstance,
    /// Client connected to Anvil
    client: RpcChainClient,
    /// Chain ID
    chain_id: u64,
}

impl AnvilTestHarness {
    /// Create a new test harness with a fresh Anvil instance
    pub async fn new() -> Result<Self> {
        Self::with_config(|anvil| anvil).await
    }

    /// Create a new test harness with custom Anvil configuration
    pub async fn with_config<F>(config: F) -> Result<Self>
    where
        F: FnOnce(Anvil) -> Anvil,
    {
        let instance = config(Anvil::new()).try_spawn()?;
        let client = RpcConnector
            .dial(&instance.endpoint(), Duration::from_secs(5))
            .await?;
        let chain_id = client.root().get_chain_id().await?;

        Ok(Self {
            instance,
            client,
            chain_id,
        })
    }

    /// Create a harness with disabled auto-mining (manual mining control)
    pub async fn with_manual_mining() -> Result<Self> {
        Self::with_config(|anvil| anvil.arg("--no-mining")).await
    }

    /// Get the RPC endpoint URL
    pub fn endpoint(&self) -> String {
        self.instance.endpoint()
    }

    pub fn client(&self) -> &RpcChainClient {
        &self.client
    }

    /// Get the provider
    pub fn provider(&self) -> &RootProvider<Ethereum> {
        self.client.root()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Pre-funded accounts (derived from [`TEST_PHRASE`])
    pub fn accounts(&self) -> &[Address] {
        self.instance.addresses()
    }

    /// Run configuration pointing at this node.
    pub fn config(&self, wallets: u32, tx_count: u64) -> RunConfig {
        RunConfig::new(self.endpoint(), TEST_PHRASE)
            .with_wallets(wallets)
            .with_tx_count(tx_count)
            .with_pacing(Duration::from_millis(1))
    }

    /// Execute a full run against this node over a fresh connection.
    pub async fn run(&self, wallets: u32, tx_count: u64) -> Result<RunReport> {
        let mut manager = TxManager::new(self.config(wallets, tx_count), RpcConnector);
        Ok(manager.run().await?)
    }

    /// Execute a full run reusing the harness connection.
    pub async fn run_shared(&self, config: RunConfig) -> Result<RunReport> {
        let mut manager = TxManager::new(config, PreparedConnector::new(self.client.clone()));
        Ok(manager.run().await?)
    }

    // ========================================================================
    // State Manipulation
    // ========================================================================

    /// Set account balance
    pub async fn set_balance(&self, address: Address, balance: U256) -> Result<()> {
        self.provider().anvil_set_balance(address, balance).await?;
        Ok(())
    }

    /// Set account nonce
    pub async fn set_nonce(&self, address: Address, nonce: u64) -> Result<()> {
        self.provider().anvil_set_nonce(address, nonce).await?;
        Ok(())
    }

    /// Get the latest (mined) nonce of an account
    pub async fn get_nonce(&self, address: Address) -> Result<u64> {
        Ok(self.provider().get_transaction_count(address).await?)
    }

    /// Get the pending nonce of an account
    pub async fn get_pending_nonce(&self, address: Address) -> Result<u64> {
        Ok(self.provider().get_transaction_count(address).pending().await?)
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        Ok(self.provider().get_balance(address).await?)
    }

    // ========================================================================
    // Mining Control
    // ========================================================================

    /// Mine a single block
    pub async fn mine_block(&self) -> Result<()> {
        self.provider().anvil_mine(Some(1), None).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
