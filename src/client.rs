//! Chain client capability used by every phase of a run.
//!
//! The orchestration engine only needs a narrow slice of JSON-RPC: nonces,
//! fee hints, balances and raw submission. [`ChainClient`] names that slice so
//! the engine can run against a live endpoint ([`RpcChainClient`]) or a scripted
//! one in tests.
//!
//! ## Architecture
//!
//! ```text
//! ChainConnector::dial(endpoint, timeout)
//!     │
//!     ▼
//! Arc<ChainClient>  ── shared read-only by every builder and submission unit
//! ```

use std::time::Duration;

use alloy::{
    eips::{eip2718::Encodable2718, BlockNumberOrTag},
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::{TransportErrorKind, TransportResult},
};
use async_trait::async_trait;

use crate::ext::{RunError, SignedTransfer};

// ============================================================================
// Client Traits
// ============================================================================

/// Chain operations consumed by the orchestration engine.
///
/// Implementations must be safe to share across concurrent units.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain ID reported by the endpoint.
    async fn chain_id(&self) -> TransportResult<u64>;

    /// Next nonce for `address`, counting pending pool transactions.
    async fn pending_nonce(&self, address: Address) -> TransportResult<u64>;

    /// Gas estimate for a call.
    async fn estimate_gas(&self, request: TransactionRequest) -> TransportResult<u64>;

    /// Network-suggested priority fee per gas.
    async fn suggested_tip(&self) -> TransportResult<u128>;

    /// Base fee of the latest block header. `None` on chains without a fee market.
    async fn latest_base_fee(&self) -> TransportResult<Option<u128>>;

    /// Balance of `address` at the latest block.
    async fn balance_at(&self, address: Address) -> TransportResult<U256>;

    /// Submit a signed transaction, returning its hash.
    async fn submit(&self, tx: &SignedTransfer) -> TransportResult<B256>;
}

/// Establishes a [`ChainClient`] for an endpoint.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    type Client: ChainClient + 'static;

    /// Connect to `endpoint`, failing if it cannot be reached within `timeout`.
    async fn dial(&self, endpoint: &str, timeout: Duration) -> Result<Self::Client, RunError>;
}

// ============================================================================
// RpcChainClient
// ============================================================================

/// [`ChainClient`] backed by an alloy [`RootProvider`].
#[derive(Clone, Debug)]
pub struct RpcChainClient {
    provider: RootProvider<Ethereum>,
}

impl RpcChainClient {
    pub fn new(provider: RootProvider<Ethereum>) -> Self {
        Self { provider }
    }

    /// Get the underlying provider
    pub fn root(&self) -> &RootProvider<Ethereum> {
        &self.provider
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> TransportResult<u64> {
        self.provider.get_chain_id().await
    }

    async fn pending_nonce(&self, address: Address) -> TransportResult<u64> {
        self.provider.get_transaction_count(address).pending().await
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> TransportResult<u64> {
        self.provider.estimate_gas(request).await
    }

    async fn suggested_tip(&self) -> TransportResult<u128> {
        self.provider.get_max_priority_fee_per_gas().await
    }

    async fn latest_base_fee(&self) -> TransportResult<Option<u128>> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| TransportErrorKind::custom_str("latest block not found"))?;

        Ok(block.header.base_fee_per_gas.map(u128::from))
    }

    async fn balance_at(&self, address: Address) -> TransportResult<U256> {
        self.provider.get_balance(address).await
    }

    async fn submit(&self, tx: &SignedTransfer) -> TransportResult<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&tx.envelope().encoded_2718())
            .await?;
        Ok(*pending.tx_hash())
    }
}

// ============================================================================
// RpcConnector
// ============================================================================

/// Dials HTTP(S), WS(S) or IPC endpoints through alloy's [`ProviderBuilder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RpcConnector;

#[async_trait]
impl ChainConnector for RpcConnector {
    type Client = RpcChainClient;

    async fn dial(&self, endpoint: &str, timeout: Duration) -> Result<RpcChainClient, RunError> {
        let connect = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect(endpoint);

        let provider: RootProvider<Ethereum> = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(provider)) => provider,
            Ok(Err(e)) => {
                return Err(RunError::Connection {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RunError::Connection {
                    endpoint: endpoint.to_string(),
                    reason: format!("timed out after {timeout:?}"),
                })
            }
        };

        tracing::debug!(endpoint, "connected to RPC endpoint");
        Ok(RpcChainClient::new(provider))
    }
}

/// Hands out clones of an already constructed client instead of dialing.
#[derive(Clone, Debug)]
pub struct PreparedConnector<C> {
    client: C,
}

impl<C> PreparedConnector<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> ChainConnector for PreparedConnector<C>
where
    C: ChainClient + Clone + 'static,
{
    type Client = C;

    async fn dial(&self, _endpoint: &str, _timeout: Duration) -> Result<C, RunError> {
        Ok(self.client.clone())
    }
}
