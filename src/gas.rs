//! Fee parameters shared by every transaction of a run.
//!
//! `FeeAdvisor` reads the latest base fee and the suggested tip once and derives
//! a single EIP-1559 pricing triple. The triple is not refreshed while the run
//! broadcasts, however long pacing makes that phase.

use alloy::{
    primitives::{Address, U256},
    rpc::types::TransactionRequest,
};

use crate::ext::{ChainClient, RunError};

/// Default headroom added on top of the gas estimate.
pub const DEFAULT_GAS_MARGIN: u64 = 1_000;

/// EIP-1559 pricing applied to every transaction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParameters {
    /// Max priority fee per gas
    pub tip_cap: u128,
    /// Max fee per gas, at least `2 * base_fee + tip_cap`
    pub fee_cap: u128,
    pub gas_limit: u64,
}

impl FeeParameters {
    /// Derive the fee cap from a base fee and tip: `2 * base_fee + tip`.
    ///
    /// Doubling the base fee keeps the transaction includable across several
    /// consecutive full blocks.
    pub fn from_base_fee(base_fee: u128, tip_cap: u128, gas_limit: u64) -> Self {
        Self {
            tip_cap,
            fee_cap: base_fee.saturating_mul(2).saturating_add(tip_cap),
            gas_limit,
        }
    }
}

/// Computes [`FeeParameters`] from current chain state.
#[derive(Debug, Clone, Copy)]
pub struct FeeAdvisor {
    /// Value of the representative self-transfer used for gas estimation
    pub estimate_value: U256,
    /// Added to the gas estimate
    pub gas_margin: u64,
}

impl Default for FeeAdvisor {
    fn default() -> Self {
        Self {
            estimate_value: U256::from(100_000_000_000u64),
            gas_margin: DEFAULT_GAS_MARGIN,
        }
    }
}

impl FeeAdvisor {
    pub fn new(estimate_value: U256, gas_margin: u64) -> Self {
        Self { estimate_value, gas_margin }
    }

    /// Compute the run's fee parameters.
    ///
    /// `representative` is the sender (and recipient) of the self-transfer used
    /// for gas estimation.
    pub async fn compute<C>(&self, client: &C, representative: Address) -> Result<FeeParameters, RunError>
    where
        C: ChainClient + ?Sized,
    {
        let request = TransactionRequest::default()
            .from(representative)
            .to(representative)
            .value(self.estimate_value);

        let estimated = client
            .estimate_gas(request)
            .await
            .map_err(|e| RunError::FeeUnavailable(format!("gas estimation failed: {e}")))?;
        let gas_limit = estimated.saturating_add(self.gas_margin);

        let tip_cap = client
            .suggested_tip()
            .await
            .map_err(|e| RunError::FeeUnavailable(format!("failed to suggest tip cap: {e}")))?;

        let base_fee = client
            .latest_base_fee()
            .await
            .map_err(|e| RunError::FeeUnavailable(format!("failed to fetch latest header: {e}")))?
            .ok_or_else(|| {
                RunError::FeeUnavailable("node does not report a base fee (pre-London chain?)".into())
            })?;

        let fees = FeeParameters::from_base_fee(base_fee, tip_cap, gas_limit);

        tracing::debug!(
            base_fee,
            tip_cap = fees.tip_cap,
            fee_cap = fees.fee_cap,
            estimated,
            gas_limit = fees.gas_limit,
            "computed fee parameters"
        );

        Ok(fees)
    }
}
