//! Events recorded by an account.
//!
//! Events live in account state, so a rolled-back call leaves no events behind.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Events that can be emitted by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum AccountEvent {
    /// The account was set up.
    Setup {
        /// Caller that ran setup.
        initiator: Address,
        /// Initial owners.
        owners: Vec<Address>,
        /// Initial threshold.
        threshold: usize,
        /// Initial entry point.
        entry_point: Address,
    },
    /// An owner was added.
    AddedOwner {
        /// The new owner.
        owner: Address,
    },
    /// An owner was removed.
    RemovedOwner {
        /// The removed owner.
        owner: Address,
    },
    /// The threshold changed.
    ChangedThreshold {
        /// The new threshold.
        threshold: usize,
    },
    /// The entry point was replaced.
    EntryPointChanged {
        /// Previous entry point.
        previous: Address,
        /// New entry point.
        entry_point: Address,
    },
    /// A module was enabled.
    EnabledModule {
        /// The module.
        module: Address,
    },
    /// A module was disabled.
    DisabledModule {
        /// The module.
        module: Address,
    },
    /// The fallback handler changed.
    ChangedFallbackHandler {
        /// The new handler, if any.
        handler: Option<Address>,
    },
    /// A user operation passed validation.
    UserOperationValidated {
        /// Canonical hash of the operation.
        user_op_hash: B256,
        /// Nonce it consumed.
        nonce: U256,
    },
    /// An owner-approved transaction executed.
    ExecutionSuccess {
        /// Hash the owners signed.
        tx_hash: B256,
    },
    /// A module call executed.
    ExecutionFromModuleSuccess {
        /// The module.
        module: Address,
    },
    /// A module call failed and was rolled back.
    ExecutionFromModuleFailure {
        /// The module.
        module: Address,
    },
}
