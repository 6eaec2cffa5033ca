//! Per-wallet batch construction.
//!
//! A [`BatchBuilder`] turns one wallet into a [`TransactionBatch`]: a balance
//! probe (diagnostic only), one pending-nonce read, then `batch_size` signed
//! self-transfers at consecutive nonces, all priced with the run's shared
//! [`FeeParameters`].
//!
//! ## Failure policy
//!
//! - Balance probe fails: logged, construction continues.
//! - Nonce read fails: logged, the wallet contributes an empty batch.
//! - One transaction fails to sign: logged and skipped, the rest of the batch
//!   is still built.

use alloy::{
    consensus::{TxEip1559, TxEnvelope},
    primitives::{utils::format_ether, Address, TxKind, B256, U256},
};
use tracing::{debug, error, info};

use crate::ext::{ChainClient, FeeParameters, NonceRange, Wallet};

// ============================================================================
// SignedTransfer
// ============================================================================

/// A signed self-transfer ready for submission.
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    wallet_index: u32,
    from: Address,
    nonce: u64,
    envelope: TxEnvelope,
}

impl SignedTransfer {
    pub fn new(wallet_index: u32, from: Address, nonce: u64, envelope: TxEnvelope) -> Self {
        Self { wallet_index, from, nonce, envelope }
    }

    pub fn wallet_index(&self) -> u32 {
        self.wallet_index
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> B256 {
        *self.envelope.tx_hash()
    }

    pub fn envelope(&self) -> &TxEnvelope {
        &self.envelope
    }
}

// ============================================================================
// TransactionBatch
// ============================================================================

/// One wallet's signed transfers, ascending by nonce.
#[derive(Debug, Clone)]
pub struct TransactionBatch {
    wallet_index: u32,
    address: Address,
    /// Number of transfers the builder was asked for
    requested: u64,
    transfers: Vec<SignedTransfer>,
}

impl TransactionBatch {
    pub fn empty(wallet: &Wallet, requested: u64) -> Self {
        Self {
            wallet_index: wallet.index(),
            address: wallet.address(),
            requested,
            transfers: Vec::new(),
        }
    }

    pub fn wallet_index(&self) -> u32 {
        self.wallet_index
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Transfers skipped during construction
    pub fn skipped(&self) -> u64 {
        self.requested.saturating_sub(self.transfers.len() as u64)
    }

    pub fn nonces(&self) -> Vec<u64> {
        self.transfers.iter().map(SignedTransfer::nonce).collect()
    }

    pub fn transfers(&self) -> &[SignedTransfer] {
        &self.transfers
    }

    pub fn into_transfers(self) -> Vec<SignedTransfer> {
        self.transfers
    }
}

// ============================================================================
// BatchBuilder
// ============================================================================

/// Builds batches of self-transfers for one run.
#[derive(Debug, Clone, Copy)]
pub struct BatchBuilder {
    chain_id: u64,
    fees: FeeParameters,
    batch_size: u64,
    transfer_value: U256,
}

impl BatchBuilder {
    pub fn new(chain_id: u64, fees: FeeParameters, batch_size: u64, transfer_value: U256) -> Self {
        Self { chain_id, fees, batch_size, transfer_value }
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Unsigned self-transfer template at `nonce`.
    pub fn template(&self, to: Address, nonce: u64) -> TxEip1559 {
        TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit: self.fees.gas_limit,
            max_fee_per_gas: self.fees.fee_cap,
            max_priority_fee_per_gas: self.fees.tip_cap,
            to: TxKind::Call(to),
            value: self.transfer_value,
            ..Default::default()
        }
    }

    /// Build `wallet`'s batch. Never fails as a whole; see the module docs.
    pub async fn build<C>(&self, client: &C, wallet: &Wallet) -> TransactionBatch
    where
        C: ChainClient + ?Sized,
    {
        let address = wallet.address();

        match client.balance_at(address).await {
            Ok(balance) => {
                info!(%address, index = wallet.index(), balance = %format_balance(balance), "wallet balance");
            }
            Err(e) => {
                error!(%address, error = %e, "failed to get balance");
            }
        }

        let nonces = match NonceRange::fetch(client, address, self.batch_size).await {
            Ok(range) => range,
            Err(e) => {
                error!(%address, error = %e, "failed to get pending nonce");
                return TransactionBatch::empty(wallet, self.batch_size);
            }
        };

        let mut batch = TransactionBatch::empty(wallet, self.batch_size);
        for (i, nonce) in nonces.into_iter().enumerate() {
            match wallet.sign(self.template(address, nonce)) {
                Ok(envelope) => {
                    debug!(%address, nonce, "transaction created {}/{}", i + 1, self.batch_size);
                    batch
                        .transfers
                        .push(SignedTransfer::new(wallet.index(), address, nonce, envelope));
                }
                Err(e) => {
                    error!(%address, nonce, error = %e, "failed to create transaction");
                }
            }
        }

        info!(%address, built = batch.len(), skipped = batch.skipped(), "batch built");
        batch
    }
}

/// Format a wei balance in ether without trailing zeros ("1.230000" → "1.23", "2.0" → "2").
pub fn format_balance(wei: U256) -> String {
    let formatted = format_ether(wei);
    if !formatted.contains('.') {
        return formatted;
    }
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}
