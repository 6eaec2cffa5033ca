//! Deterministic wallet derivation from a BIP-39 seed phrase.
//!
//! Every wallet of a run is derived from one phrase along the standard
//! Ethereum path `m/44'/60'/0'/0/{index}`, so the same phrase and count always
//! yield the same addresses in the same order.

use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope},
    network::TxSignerSync,
    primitives::Address,
    signers::{
        k256::ecdsa::SigningKey,
        local::{
            coins_bip39::{English, Mnemonic},
            PrivateKeySigner,
        },
        Signer,
    },
};

use crate::ext::RunError;

/// Derivation path for the wallet at `index`.
pub fn derivation_path(index: u32) -> String {
    format!("m/44'/60'/0'/0/{index}")
}

// ============================================================================
// Wallet
// ============================================================================

/// A single signing identity of the run.
#[derive(Clone, Debug)]
pub struct Wallet {
    index: u32,
    signer: PrivateKeySigner,
}

impl Wallet {
    pub fn new(index: u32, signer: PrivateKeySigner) -> Self {
        Self { index, signer }
    }

    /// Derivation index of this wallet (0..K-1)
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Bind the signer to `chain_id`; transactions for any other chain are refused.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.signer.set_chain_id(Some(chain_id));
        self
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.signer.chain_id()
    }

    /// Sign an EIP-1559 transaction with this wallet's key.
    pub fn sign(&self, mut tx: TxEip1559) -> alloy::signers::Result<TxEnvelope> {
        let signature = self.signer.sign_transaction_sync(&mut tx)?;
        Ok(TxEnvelope::Eip1559(tx.into_signed(signature)))
    }
}

// ============================================================================
// WalletSet
// ============================================================================

/// Exactly K wallets derived from one seed phrase, ordered by index.
#[derive(Clone, Debug)]
pub struct WalletSet {
    wallets: Vec<Wallet>,
}

impl WalletSet {
    /// Validate a seed phrase without deriving anything.
    pub fn validate_phrase(phrase: &str) -> Result<(), RunError> {
        parse_phrase(phrase).map(|_| ())
    }

    /// Derive `count` wallets from `phrase`.
    ///
    /// Derivation is all-or-nothing: a failure at any index aborts and no
    /// partial set is returned.
    pub fn derive(phrase: &str, count: u32) -> Result<Self, RunError> {
        if count == 0 {
            return Err(RunError::Config("wallet count must be > 0".into()));
        }

        let mnemonic = parse_phrase(phrase)?;

        let wallets = (0..count)
            .map(|index| {
                let path = derivation_path(index);
                let key = mnemonic
                    .derive_key(path.as_str(), None)
                    .map_err(|e| RunError::Derivation { index, reason: e.to_string() })?;
                let key: &SigningKey = key.as_ref();
                Ok(Wallet::new(index, PrivateKeySigner::from_signing_key(key.clone())))
            })
            .collect::<Result<Vec<_>, RunError>>()?;

        tracing::trace!(count, "derived wallets");
        Ok(Self { wallets })
    }

    /// Bind every wallet's signer to `chain_id`.
    pub fn with_chain_id(self, chain_id: u64) -> Self {
        Self {
            wallets: self.wallets.into_iter().map(|w| w.with_chain_id(chain_id)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Wallet> {
        self.wallets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Wallet> {
        self.wallets.iter()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.wallets.iter().map(Wallet::address).collect()
    }
}

impl IntoIterator for WalletSet {
    type Item = Wallet;
    type IntoIter = std::vec::IntoIter<Wallet>;

    fn into_iter(self) -> Self::IntoIter {
        self.wallets.into_iter()
    }
}

fn parse_phrase(phrase: &str) -> Result<Mnemonic<English>, RunError> {
    Mnemonic::<English>::new_from_phrase(phrase.trim())
        .map_err(|e| RunError::InvalidSeed(e.to_string()))
}
