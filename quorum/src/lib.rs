#![cfg_attr(docsrs, feature(doc_cfg))]
//! Quorum is the core of a multi-owner account-abstraction wallet.
//!
//! An [`Account`] is controlled by a set of owners and an approval threshold.
//! Operations reach it from three directions:
//!
//! - the **entry point** validates signed [`UserOperation`]s
//!   ([`Account::validate_user_op`]) and then drives single or batched
//!   execution;
//! - enabled **modules** execute calls directly;
//! - anyone can submit a transaction carrying enough **owner signatures**
//!   ([`Account::exec_transaction`]).
//!
//! Every externally reachable operation is all-or-nothing: account state and
//! the [`Host`] ledger are checkpointed and restored together on failure.
//!
//! # Example
//!
//! ```rust,ignore
//! use quorum::prelude::*;
//!
//! let mut ledger = InMemoryLedger::new(1);
//! let mut account = Account::new(account_address);
//! let config = AccountConfig::builder()
//!     .owners([alice, bob])
//!     .threshold(2)
//!     .entry_point(entry_point)
//!     .build()?;
//! account.setup(alice, &mut ledger, &config)?;
//!
//! let hash = account.user_op_hash(&op, &ledger);
//! let verdict = account.validate_user_op(entry_point, &mut ledger, &op, hash, prefund)?;
//! assert!(verdict.is_success());
//! ```

pub mod abi;
pub mod account;
pub mod config;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod signature;
pub mod user_op;

#[cfg(test)]
pub(crate) mod test_utils;

pub use account::{Account, AccountEvent};
pub use config::{AccountConfig, AccountConfigBuilder, Initializer};
pub use error::{AccountError, ConfigError, Error, Result, SignatureError};
pub use execution::{BatchItem, CallKind};
pub use ledger::{Contract, Host, InMemoryLedger, Library};
pub use user_op::{SIG_VALIDATION_FAILED, UserOperation, ValidationData, ValidationFailure};

/// Commonly used types.
pub mod prelude {
    pub use crate::abi::IQuorumAccount;
    pub use crate::account::{Account, AccountEvent};
    pub use crate::config::AccountConfig;
    pub use crate::error::{AccountError, AccountResult, Error, Result};
    pub use crate::execution::{BatchItem, CallKind};
    pub use crate::ledger::{CallContext, Contract, Host, InMemoryLedger, Library, revert_reason};
    pub use crate::signature::{pack_signatures, recover_signers};
    pub use crate::user_op::{UserOperation, ValidationData};
}
