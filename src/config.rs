use std::{fmt, time::Duration};

use alloy::primitives::U256;
use tokio::sync::Semaphore;

use crate::ext::{
    Broadcaster, FeeAdvisor, RunError, WalletSet, DEFAULT_GAS_MARGIN, DEFAULT_MAX_IN_FLIGHT,
    DEFAULT_PACING,
};

/// Default bound on concurrently running batch builders.
pub const DEFAULT_MAX_CONCURRENT_BUILDERS: usize = 64;

// ============================================================================
// Run Configuration
// ============================================================================

/// Configuration for one orchestration run.
#[derive(Clone)]
pub struct RunConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// BIP-39 seed phrase all wallets are derived from
    pub mnemonic: String,
    /// Number of wallets to derive (default: 10)
    pub wallets: u32,
    /// Total transactions requested (default: 100)
    pub tx_count: u64,
    /// Minimum wait between submission initiations (default: 10ms)
    pub pacing: Duration,
    /// Bound on the initial dial (default: 10 seconds)
    pub connect_timeout: Duration,
    /// Value carried by every self-transfer (default: 10_000 wei)
    pub transfer_value: U256,
    /// Value of the representative transfer used for gas estimation
    pub estimate_value: U256,
    /// Added on top of the gas estimate (default: 1000)
    pub gas_margin: u64,
    /// Chain ID used when the endpoint cannot report one (default: 1)
    pub fallback_chain_id: u64,
    /// Batch builders allowed to run at once (default: 64)
    pub max_concurrent_builders: usize,
    /// Submissions allowed in flight at once (default: 1024)
    pub max_in_flight: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            mnemonic: String::new(),
            wallets: 10,
            tx_count: 100,
            pacing: DEFAULT_PACING,
            connect_timeout: Duration::from_secs(10),
            transfer_value: U256::from(10_000u64),
            estimate_value: U256::from(100_000_000_000u64),
            gas_margin: DEFAULT_GAS_MARGIN,
            fallback_chain_id: 1,
            max_concurrent_builders: DEFAULT_MAX_CONCURRENT_BUILDERS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

// The seed phrase never reaches logs.
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("rpc_url", &self.rpc_url)
            .field("mnemonic", &"<redacted>")
            .field("wallets", &self.wallets)
            .field("tx_count", &self.tx_count)
            .field("pacing", &self.pacing)
            .field("connect_timeout", &self.connect_timeout)
            .field("transfer_value", &self.transfer_value)
            .field("estimate_value", &self.estimate_value)
            .field("gas_margin", &self.gas_margin)
            .field("fallback_chain_id", &self.fallback_chain_id)
            .field("max_concurrent_builders", &self.max_concurrent_builders)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

impl RunConfig {
    pub fn new(rpc_url: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            mnemonic: mnemonic.into(),
            ..Default::default()
        }
    }

    pub fn with_wallets(mut self, wallets: u32) -> Self {
        self.wallets = wallets;
        self
    }

    pub fn with_tx_count(mut self, tx_count: u64) -> Self {
        self.tx_count = tx_count;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_transfer_value(mut self, value: U256) -> Self {
        self.transfer_value = value;
        self
    }

    pub fn with_estimate_value(mut self, value: U256) -> Self {
        self.estimate_value = value;
        self
    }

    pub fn with_gas_margin(mut self, margin: u64) -> Self {
        self.gas_margin = margin;
        self
    }

    pub fn with_fallback_chain_id(mut self, chain_id: u64) -> Self {
        self.fallback_chain_id = chain_id;
        self
    }

    pub fn with_max_concurrent_builders(mut self, max: usize) -> Self {
        self.max_concurrent_builders = max;
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Transactions built per wallet. The `tx_count % wallets` remainder is never built.
    pub fn batch_size(&self) -> u64 {
        if self.wallets == 0 {
            return 0;
        }
        self.tx_count / u64::from(self.wallets)
    }

    /// Transactions the run will attempt to build.
    pub fn planned_transactions(&self) -> u64 {
        self.batch_size() * u64::from(self.wallets)
    }

    pub fn fee_advisor(&self) -> FeeAdvisor {
        FeeAdvisor::new(self.estimate_value, self.gas_margin)
    }

    pub fn broadcaster(&self) -> Broadcaster {
        Broadcaster::new(self.pacing, self.max_in_flight)
    }

    /// Reject configurations that cannot produce a run.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.rpc_url.trim().is_empty() {
            return Err(RunError::Config("rpc url must not be empty".into()));
        }
        if self.wallets == 0 {
            return Err(RunError::Config("wallet count must be > 0".into()));
        }
        if self.tx_count == 0 {
            return Err(RunError::Config("transaction count must be > 0".into()));
        }
        if self.max_concurrent_builders == 0 {
            return Err(RunError::Config("max concurrent builders must be > 0".into()));
        }
        if self.max_in_flight == 0 {
            return Err(RunError::Config("max in-flight submissions must be > 0".into()));
        }
        if self.max_concurrent_builders > Semaphore::MAX_PERMITS {
            return Err(RunError::Config(format!(
                "max concurrent builders must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.max_in_flight > Semaphore::MAX_PERMITS {
            return Err(RunError::Config(format!(
                "max in-flight submissions must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }
        WalletSet::validate_phrase(&self.mnemonic)
    }
}
