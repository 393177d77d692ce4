//! Unified error types for the quorum wallet.
//!
//! Failures come in two tiers:
//! - hard failures ([`AccountError`]) abort the enclosing call, and every
//!   state change it made is rolled back;
//! - soft user-operation validation failures are not errors at all, they are
//!   reported through [`ValidationData`](crate::user_op::ValidationData) so the
//!   entry point can branch on them.

use alloy::primitives::{Address, Bytes, U256};

/// Result type alias for quorum operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the quorum crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Account state machine rejected the call.
    #[error("account: {0}")]
    Account(#[from] AccountError),

    /// Signature decoding or recovery failed.
    #[error("signature: {0}")]
    Signature(#[from] SignatureError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

// ============================================================================
// Account Errors
// ============================================================================

/// Hard failures raised by the account.
///
/// Any of these aborts the call that produced it. When it escapes a public
/// entry point of [`Account`](crate::Account), account and ledger state are
/// exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AccountError {
    /// The account has not been set up yet.
    #[error("account is not initialized")]
    NotInitialized,

    /// `setup` was called on an account that is already set up.
    #[error("account is already initialized")]
    AlreadyInitialized,

    /// Caller is not the configured entry point.
    #[error("caller {caller} is not the entry point {expected}")]
    EntryPointInvalid {
        /// The rejected caller.
        caller: Address,
        /// The currently configured entry point.
        expected: Address,
    },

    /// Caller does not satisfy the owner gate.
    #[error("caller {caller} is not authorized")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// Address cannot be an owner (zero address or the account itself).
    #[error("invalid owner address {0}")]
    InvalidOwner(Address),

    /// Owner is already part of the owner set.
    #[error("owner {0} already exists")]
    OwnerAlreadyExists(Address),

    /// Address is not an owner.
    #[error("owner {0} not found")]
    OwnerNotFound(Address),

    /// Threshold would fall outside `1..=owners`.
    #[error("invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold {
        /// The requested threshold.
        threshold: U256,
        /// Owner count the threshold was checked against.
        owners: usize,
    },

    /// Entry point cannot be the zero address.
    #[error("entry point cannot be the zero address")]
    InvalidEntryPoint,

    /// Address cannot be a module (zero address or the account itself).
    #[error("invalid module address {0}")]
    InvalidModule(Address),

    /// Module is already enabled.
    #[error("module {0} is already enabled")]
    ModuleAlreadyEnabled(Address),

    /// Module is not enabled.
    #[error("module {0} is not enabled")]
    ModuleNotEnabled(Address),

    /// Nonce did not match the sequencer.
    #[error("nonce mismatch: expected {expected}, got {actual}")]
    NonceMismatch {
        /// The current nonce.
        expected: U256,
        /// The nonce that was presented.
        actual: U256,
    },

    /// The paying address cannot cover a transfer.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount that had to be paid.
        required: U256,
        /// Balance available to the payer.
        available: U256,
    },

    /// An external sub-call reverted. The revert data is forwarded as-is.
    #[error("call to {target} reverted with {reason}")]
    CallReverted {
        /// Target of the reverted call.
        target: Address,
        /// Raw revert data.
        reason: Bytes,
    },

    /// One item of a batch failed; the whole batch was rolled back.
    #[error("batch transactions failed at item {index}: {source}")]
    BatchTransactionsFailed {
        /// Position of the failing item.
        index: usize,
        /// Failure of that item.
        source: Box<AccountError>,
    },

    /// Owner signatures did not reach the threshold.
    #[error("signatures reach {approvals} of {threshold} required approvals")]
    ThresholdNotMet {
        /// Distinct owners that signed.
        approvals: usize,
        /// Configured threshold.
        threshold: usize,
    },

    /// Owner signatures could not be decoded.
    #[error("invalid signatures: {0}")]
    InvalidSignatures(#[from] SignatureError),

    /// Payload selector is not part of the account ABI and no fallback handler is set.
    #[error("unknown selector 0x{}", alloy::primitives::hex::encode(.0))]
    UnknownSelector([u8; 4]),

    /// Payload could not be decoded.
    #[error("decode: {0}")]
    Decode(String),
}

impl AccountError {
    /// Create a decode error.
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid threshold error.
    #[must_use]
    pub const fn invalid_threshold(threshold: U256, owners: usize) -> Self {
        Self::InvalidThreshold { threshold, owners }
    }

    /// Wrap a failing batch item.
    #[must_use]
    pub fn batch_failed(index: usize, source: Self) -> Self {
        Self::BatchTransactionsFailed {
            index,
            source: Box::new(source),
        }
    }

    /// Check if this is an access-control rejection.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::EntryPointInvalid { .. } | Self::Unauthorized { .. } | Self::ModuleNotEnabled(_)
        )
    }
}

/// Result type for account operations.
pub type AccountResult<T> = std::result::Result<T, AccountError>;

// ============================================================================
// Signature Errors
// ============================================================================

/// Error type for packed owner signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SignatureError {
    /// Signature bytes are not a whole number of 65-byte signatures.
    #[error("malformed signature blob of {len} bytes")]
    Malformed {
        /// Length of the blob.
        len: usize,
    },

    /// ECDSA recovery failed for one signature.
    #[error("recovery failed: {0}")]
    Recovery(String),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing required field.
    #[error("missing: {0}")]
    Missing(String),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a missing field error.
    #[inline]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }

    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
