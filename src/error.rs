//! Run error taxonomy and RPC error classification.
//!
//! [`RunError`] covers every condition that stops a run. Failures of a single
//! transaction (build or submission) never become a `RunError`; they are logged,
//! classified with [`classify_rpc_error`] and counted in the run statistics.

use alloy::transports::RpcError;

// ============================================================================
// Run Errors
// ============================================================================

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The seed phrase failed BIP-39 validation.
    #[error("invalid seed phrase: {0}")]
    InvalidSeed(String),

    /// A wallet index could not be derived. No partial wallet set is returned.
    #[error("failed to derive wallet at index {index}: {reason}")]
    Derivation { index: u32, reason: String },

    /// The chain does not expose fee-market data, or gas estimation failed.
    #[error("fee parameters unavailable: {0}")]
    FeeUnavailable(String),

    /// The RPC endpoint could not be reached within the connect timeout.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// Run configuration is not usable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RunError {
    /// Connection failures abort the run with no partial output.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunError::Connection { .. })
    }

    /// Errors detected before any wallet or fee work began.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunError::Config(_) | RunError::InvalidSeed(_) | RunError::FeeUnavailable(_)
        )
    }
}

// ============================================================================
// Error Classification Types
// ============================================================================

/// Classified RPC error types, used to break down submission failures.
///
/// The broadcaster never retries, so the kind is diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RpcErrorKind {
    /// Nonce is lower than expected (already used on chain)
    NonceTooLow,

    /// Nonce creates a gap (higher than expected)
    NonceTooHigh,

    /// Fee cap or tip too low for the pool or the current base fee
    Underpriced,

    /// Insufficient funds for gas * price + value
    InsufficientFunds,

    /// Gas limit too low for transaction
    IntrinsicGasTooLow,

    /// Network/connection error
    NetworkError,

    /// Transaction already known (duplicate)
    AlreadyKnown,

    /// Unknown or unclassified error
    Unknown,
}

impl RpcErrorKind {
    /// Short label used in log fields and the final summary.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorKind::NonceTooLow => "nonce_too_low",
            RpcErrorKind::NonceTooHigh => "nonce_too_high",
            RpcErrorKind::Underpriced => "underpriced",
            RpcErrorKind::InsufficientFunds => "insufficient_funds",
            RpcErrorKind::IntrinsicGasTooLow => "intrinsic_gas_too_low",
            RpcErrorKind::NetworkError => "network",
            RpcErrorKind::AlreadyKnown => "already_known",
            RpcErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error Classification Functions
// ============================================================================

/// Classify an RPC error into a known error kind by pattern matching.
pub fn classify_rpc_error<E: std::fmt::Display>(error: &RpcError<E>) -> RpcErrorKind {
    classify_message(&error.to_string())
}

/// Classify a raw error message. Providers word the same condition differently,
/// so several patterns are checked per kind.
pub fn classify_message(message: &str) -> RpcErrorKind {
    let error_str = message.to_lowercase();

    if error_str.contains("nonce too low")
        || error_str.contains("nonce is too low")
        || error_str.contains("invalid nonce")
            && (error_str.contains("too low") || error_str.contains("expected"))
    {
        return RpcErrorKind::NonceTooLow;
    }

    if error_str.contains("nonce too high")
        || error_str.contains("nonce is too high")
        || error_str.contains("nonce gap")
    {
        return RpcErrorKind::NonceTooHigh;
    }

    if error_str.contains("underpriced")
        || error_str.contains("gas price too low")
        || error_str.contains("max fee per gas less than block base fee")
    {
        return RpcErrorKind::Underpriced;
    }

    if error_str.contains("insufficient funds")
        || error_str.contains("insufficient balance")
        || error_str.contains("not enough funds")
        || error_str.contains("exceeds balance")
    {
        return RpcErrorKind::InsufficientFunds;
    }

    if error_str.contains("intrinsic gas too low")
        || error_str.contains("gas limit too low")
        || error_str.contains("out of gas")
    {
        return RpcErrorKind::IntrinsicGasTooLow;
    }

    if error_str.contains("already known")
        || error_str.contains("already imported")
        || error_str.contains("transaction already exists")
        || error_str.contains("known transaction")
    {
        return RpcErrorKind::AlreadyKnown;
    }

    if error_str.contains("connection")
        || error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("network")
        || error_str.contains("transport")
        || error_str.contains("eof")
        || error_str.contains("broken pipe")
    {
        return RpcErrorKind::NetworkError;
    }

    RpcErrorKind::Unknown
}
