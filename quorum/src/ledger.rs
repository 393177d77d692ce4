//! Host ledger the account runs on.
//!
//! The account never owns balances or foreign code. It reaches them through
//! the [`Host`] trait, which also provides the checkpoint/revert primitive
//! used to make every account entry point all-or-nothing.
//!
//! # Architecture
//!
//! ```text
//! Host
//!   ├── balance() / transfer()   → native value
//!   ├── call()                   → ordinary call into a Contract
//!   ├── library()                → code run in the account's context (delegated call)
//!   └── checkpoint() / revert_to() / commit()
//! ```
//!
//! [`InMemoryLedger`] is the in-process implementation: a balance map, a
//! contract map and a stack of snapshots.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{Revert, SolError};
use tracing::{debug, trace};

use crate::account::Account;
use crate::error::{AccountError, AccountResult};

/// Handle returned by [`Host::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checkpoint(usize);

/// Context of an ordinary call into a [`Contract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Immediate caller.
    pub caller: Address,
    /// Native value attached to the call.
    pub value: U256,
}

/// Code deployed at an address and reachable through [`Host::call`].
///
/// Returning `Err` reverts the call; the bytes are the revert data handed
/// back to the caller unchanged.
pub trait Contract: fmt::Debug + Send {
    /// Handle a call.
    fn call(&mut self, ctx: CallContext, data: &Bytes) -> Result<Bytes, Bytes>;

    /// Clone this contract behind a box. Used to snapshot ledger state.
    fn clone_box(&self) -> Box<dyn Contract>;
}

impl Clone for Box<dyn Contract> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Code executed in the calling account's context by a delegated call.
///
/// The library sees the account itself and may drive it exactly as the
/// account's own code would.
pub trait Library: fmt::Debug + Send + Sync {
    /// Run the library against `account`. `caller` is the caller of the
    /// account call that issued the delegated call.
    fn delegate_call(
        &self,
        account: &mut Account,
        caller: Address,
        host: &mut dyn Host,
        data: &Bytes,
    ) -> AccountResult<Bytes>;
}

/// The ledger surface an [`Account`] needs.
pub trait Host {
    /// Chain identifier user operations are bound to.
    fn chain_id(&self) -> u64;

    /// Native balance of `address`.
    fn balance(&self, address: Address) -> U256;

    /// Move native value between two addresses.
    fn transfer(&mut self, from: Address, to: Address, value: U256) -> AccountResult<()>;

    /// Ordinary call from `caller` to `target` carrying `value`.
    ///
    /// Value moves before the target's code runs and is returned if it reverts.
    fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: U256,
        data: &Bytes,
    ) -> AccountResult<Bytes>;

    /// Library deployed at `address`, if any.
    fn library(&self, address: Address) -> Option<Arc<dyn Library>>;

    /// Snapshot the ledger.
    fn checkpoint(&mut self) -> Checkpoint;

    /// Restore the snapshot taken by `checkpoint`, discarding newer ones.
    fn revert_to(&mut self, checkpoint: Checkpoint);

    /// Keep all changes since `checkpoint` and drop the snapshot.
    fn commit(&mut self, checkpoint: Checkpoint);
}

/// Encode a plain-text revert reason as `Error(string)` revert data.
#[must_use]
pub fn revert_reason(reason: impl Into<String>) -> Bytes {
    Revert {
        reason: reason.into(),
    }
    .abi_encode()
    .into()
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    balances: HashMap<Address, U256>,
    contracts: HashMap<Address, Box<dyn Contract>>,
}

/// In-process journaled ledger.
#[derive(Debug)]
pub struct InMemoryLedger {
    chain_id: u64,
    state: LedgerState,
    libraries: HashMap<Address, Arc<dyn Library>>,
    checkpoints: Vec<LedgerState>,
}

impl InMemoryLedger {
    /// Create an empty ledger for `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: LedgerState::default(),
            libraries: HashMap::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Credit `value` to `address` out of thin air.
    pub fn fund(&mut self, address: Address, value: U256) {
        let balance = self.state.balances.entry(address).or_default();
        *balance = balance.saturating_add(value);
    }

    /// Deploy `contract` at `address`, replacing whatever was there.
    pub fn deploy(&mut self, address: Address, contract: impl Contract + 'static) {
        debug!(address = %address, "contract deployed");
        self.state.contracts.insert(address, Box::new(contract));
    }

    /// Register a delegate-call library at `address`.
    pub fn deploy_library(&mut self, address: Address, library: impl Library + 'static) {
        debug!(address = %address, "library deployed");
        self.libraries.insert(address, Arc::new(library));
    }

    /// Check whether code lives at `address`.
    #[must_use]
    pub fn has_code(&self, address: Address) -> bool {
        self.state.contracts.contains_key(&address) || self.libraries.contains_key(&address)
    }

    /// Number of open checkpoints.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }
}

impl Host for InMemoryLedger {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn balance(&self, address: Address) -> U256 {
        self.state
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> AccountResult<()> {
        if value.is_zero() || from == to {
            return Ok(());
        }
        let available = self.balance(from);
        let remaining = available
            .checked_sub(value)
            .ok_or(AccountError::InsufficientFunds {
                required: value,
                available,
            })?;
        self.state.balances.insert(from, remaining);
        self.fund(to, value);
        trace!(from = %from, to = %to, value = %value, "transfer");
        Ok(())
    }

    fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: U256,
        data: &Bytes,
    ) -> AccountResult<Bytes> {
        let checkpoint = self.checkpoint();
        if let Err(err) = self.transfer(caller, target, value) {
            self.revert_to(checkpoint);
            return Err(err);
        }

        let Some(contract) = self.state.contracts.get_mut(&target) else {
            self.commit(checkpoint);
            return Ok(Bytes::new());
        };

        match contract.call(CallContext { caller, value }, data) {
            Ok(output) => {
                self.commit(checkpoint);
                Ok(output)
            }
            Err(reason) => {
                self.revert_to(checkpoint);
                debug!(target = %target, "call reverted");
                Err(AccountError::CallReverted { target, reason })
            }
        }
    }

    fn library(&self, address: Address) -> Option<Arc<dyn Library>> {
        self.libraries.get(&address).map(Arc::clone)
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push(self.state.clone());
        Checkpoint(self.checkpoints.len() - 1)
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.checkpoints.len() {
            return;
        }
        self.checkpoints.truncate(checkpoint.0 + 1);
        if let Some(state) = self.checkpoints.pop() {
            self.state = state;
        }
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.truncate(checkpoint.0);
    }
}
