//! # icarus
//!
//! Concurrent multi-wallet transaction orchestration on top of Alloy.
//!
//! A run derives K wallets from one seed phrase, prices every transaction
//! with one shared set of EIP-1559 fee parameters, builds each wallet's batch
//! of self-transfers concurrently at contiguous nonces, and broadcasts the
//! merged set with a fixed pacing interval between submission initiations.
//!
//! ## Core Features
//!
//! - **Deterministic Wallets**: BIP-44 derivation at `m/44'/60'/0'/0/{i}`
//! - **Contiguous Nonces**: one pending-nonce read per wallet, no gaps, no repeats
//! - **Bounded Fan-out**: semaphore-bounded batch builders and in-flight submissions
//! - **Paced Broadcast**: pacing on initiation, submissions overlap in flight
//! - **Outcome Accounting**: success/failure tally with per-kind failure breakdown
//!
//! ## Usage
//!
//! ```ignore
//! use icarus::ext::*;
//!
//! let config = RunConfig::new(rpc_url, mnemonic)
//!     .with_wallets(10)
//!     .with_tx_count(100);
//! let report = TxManager::new(config, RpcConnector).run().await?;
//! ```

// ============================================================================
// Internal Module Declarations
// ============================================================================

/// Merges concurrently built batches into one submission order
mod aggregator;

/// Per-wallet batch construction
mod batch;

/// Paced concurrent submission
mod broadcast;

/// Chain client traits and the alloy-backed implementation
mod client;

/// Run configuration
mod config;

/// Run error taxonomy and RPC error classification
mod error;

/// Shared EIP-1559 fee parameters
mod gas;

/// Run orchestration and phase state machine
mod manager;

/// Contiguous nonce ranges
mod nonce;

/// Submission outcome accounting
mod stats;

/// Wallet derivation and signing
mod wallet;

/// Test harness module (compiled only in test mode)
#[cfg(test)]
pub mod test_harness;

// ============================================================================
// Public Exports
// ============================================================================

/// Re-export the alloy crate so callers can build clients and types directly.
pub use alloy;

/// All public APIs:
///
/// - `TxManager` / `RunConfig` / `RunReport` - run orchestration
/// - `WalletSet`, `FeeAdvisor`, `BatchBuilder`, `Aggregator`, `Broadcaster`, `StatsCounter` - run components
/// - `ChainClient` / `ChainConnector` - chain collaborator traits
/// - `RunError` / `classify_rpc_error` - error taxonomy
pub mod ext {
    pub use super::aggregator::*;
    pub use super::batch::*;
    pub use super::broadcast::*;
    pub use super::client::*;
    pub use super::config::*;
    pub use super::error::*;
    pub use super::gas::*;
    pub use super::manager::*;
    pub use super::nonce::*;
    pub use super::stats::*;
    pub use super::wallet::*;
}
