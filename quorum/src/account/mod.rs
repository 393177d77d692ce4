//! The account aggregate.
//!
//! [`Account`] owns every piece of mutable wallet state: owners and
//! threshold, the user-operation nonce, the entry point, enabled modules and
//! the event log. Mutations happen through gated operations only.
//!
//! # Access policy
//!
//! ```text
//! owner gate        caller == account
//!                   or (caller is an owner and threshold == 1)
//! entry-point gate  caller == entry_point
//! module gate       caller is an enabled module
//! ```
//!
//! A call the account makes to its own address runs with the account as
//! caller, which is how entry-point execution, module execution and
//! owner-signed transactions pass the owner gate.
//!
//! # Atomicity
//!
//! Public entry points that touch the ledger run through [`Account::transact`]:
//! account state and ledger state are checkpointed first and both are restored
//! if the call fails.

mod entry_point;
mod events;
mod modules;
mod nonce;
mod owners;

pub use entry_point::EntryPointGate;
pub use events::AccountEvent;
pub use modules::ModuleManager;
pub use nonce::NonceSequencer;
pub use owners::OwnerRegistry;

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use crate::config::AccountConfig;
use crate::error::{AccountError, AccountResult, Result};
use crate::execution::CallKind;
use crate::ledger::Host;

/// A multi-owner account-abstraction wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Address the account lives at.
    address: Address,
    /// Whether `setup` ran.
    initialized: bool,
    /// Owners and threshold.
    owners: OwnerRegistry,
    /// Nonce for user operations.
    nonce: NonceSequencer,
    /// Nonce for owner-signed transactions.
    tx_nonce: NonceSequencer,
    /// Active entry point.
    entry_point: EntryPointGate,
    /// Enabled modules.
    modules: ModuleManager,
    /// Handler for calls outside the account ABI.
    fallback_handler: Option<Address>,
    /// Events not yet drained.
    events: Vec<AccountEvent>,
}

impl Account {
    /// Create an account at `address`. It must be set up before use.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            initialized: false,
            owners: OwnerRegistry::default(),
            nonce: NonceSequencer::new(),
            tx_nonce: NonceSequencer::new(),
            entry_point: EntryPointGate::default(),
            modules: ModuleManager::new(address),
            fallback_handler: None,
            events: Vec::new(),
        }
    }

    /// One-time initialization.
    ///
    /// Stores owners, threshold, entry point and fallback handler, runs the
    /// optional initializer as a delegated call and pays the optional setup
    /// payment from the account's balance. On failure nothing is kept.
    pub fn setup(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        config: &AccountConfig,
    ) -> Result<()> {
        if self.initialized {
            return Err(AccountError::AlreadyInitialized.into());
        }
        config.validate()?;

        self.transact(host, |account, host| {
            account.owners = OwnerRegistry::new(account.address, &config.owners, config.threshold)?;
            account.entry_point = EntryPointGate::new(config.entry_point)?;
            account.fallback_handler = config.fallback_handler;
            account.initialized = true;

            if let Some(initializer) = &config.initializer {
                account.execute(
                    caller,
                    host,
                    initializer.to,
                    U256::ZERO,
                    &initializer.data,
                    CallKind::DelegateCall,
                )?;
            }
            if !config.payment.is_zero() {
                let receiver = config.payment_receiver.unwrap_or(caller);
                host.transfer(account.address, receiver, config.payment)?;
            }

            account.emit(AccountEvent::Setup {
                initiator: caller,
                owners: config.owners.clone(),
                threshold: config.threshold,
                entry_point: config.entry_point,
            });
            Ok(())
        })?;

        info!(
            account = %self.address,
            owners = self.owners.len(),
            threshold = self.owners.threshold(),
            entry_point = %self.entry_point.entry_point(),
            "account set up",
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Address of the account.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Whether setup ran.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Check whether `address` is an owner.
    #[must_use]
    pub fn is_owner(&self, address: Address) -> bool {
        self.owners.is_owner(address)
    }

    /// Owners in insertion order.
    #[must_use]
    pub fn owners(&self) -> &[Address] {
        self.owners.owners()
    }

    /// Approval threshold.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.owners.threshold()
    }

    /// Nonce the next user operation must carry.
    #[must_use]
    pub const fn nonce(&self) -> U256 {
        self.nonce.current()
    }

    /// Nonce the next owner-signed transaction is bound to.
    #[must_use]
    pub const fn transaction_nonce(&self) -> U256 {
        self.tx_nonce.current()
    }

    /// Active entry point.
    #[must_use]
    pub const fn entry_point(&self) -> Address {
        self.entry_point.entry_point()
    }

    /// Check whether `module` is enabled.
    #[must_use]
    pub fn is_module_enabled(&self, module: Address) -> bool {
        self.modules.is_enabled(module)
    }

    /// Enabled modules.
    #[must_use]
    pub fn modules(&self) -> &[Address] {
        self.modules.modules()
    }

    /// Fallback handler, if set.
    #[must_use]
    pub const fn fallback_handler(&self) -> Option<Address> {
        self.fallback_handler
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn events(&self) -> &[AccountEvent] {
        &self.events
    }

    /// Take all recorded events.
    pub fn drain_events(&mut self) -> Vec<AccountEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // Owner-gated operations
    // ------------------------------------------------------------------------

    /// Add `owner` and set the threshold in one step.
    pub fn add_owner_with_threshold(
        &mut self,
        caller: Address,
        owner: Address,
        threshold: usize,
    ) -> AccountResult<()> {
        self.authorize(caller)?;
        let previous = self.owners.threshold();
        self.owners.add_owner(owner, threshold)?;
        info!(account = %self.address, owner = %owner, threshold, "owner added");
        self.emit(AccountEvent::AddedOwner { owner });
        self.emit_threshold_change(previous);
        Ok(())
    }

    /// Remove `owner` and set the threshold in one step.
    pub fn remove_owner(
        &mut self,
        caller: Address,
        owner: Address,
        threshold: usize,
    ) -> AccountResult<()> {
        self.authorize(caller)?;
        let previous = self.owners.threshold();
        self.owners.remove_owner(owner, threshold)?;
        info!(account = %self.address, owner = %owner, threshold, "owner removed");
        self.emit(AccountEvent::RemovedOwner { owner });
        self.emit_threshold_change(previous);
        Ok(())
    }

    /// Replace `old` with `new`.
    pub fn swap_owner(&mut self, caller: Address, old: Address, new: Address) -> AccountResult<()> {
        self.authorize(caller)?;
        self.owners.swap_owner(old, new)?;
        info!(account = %self.address, old = %old, new = %new, "owner swapped");
        self.emit(AccountEvent::RemovedOwner { owner: old });
        self.emit(AccountEvent::AddedOwner { owner: new });
        Ok(())
    }

    /// Change the threshold.
    pub fn change_threshold(&mut self, caller: Address, threshold: usize) -> AccountResult<()> {
        self.authorize(caller)?;
        self.owners.change_threshold(threshold)?;
        info!(account = %self.address, threshold, "threshold changed");
        self.emit(AccountEvent::ChangedThreshold { threshold });
        Ok(())
    }

    /// Replace the entry point. The old one loses its rights immediately.
    pub fn update_entry_point(&mut self, caller: Address, entry_point: Address) -> AccountResult<()> {
        self.authorize(caller)?;
        let previous = self.entry_point.update(entry_point)?;
        info!(
            account = %self.address,
            previous = %previous,
            entry_point = %entry_point,
            "entry point changed",
        );
        self.emit(AccountEvent::EntryPointChanged {
            previous,
            entry_point,
        });
        Ok(())
    }

    /// Enable `module`.
    pub fn enable_module(&mut self, caller: Address, module: Address) -> AccountResult<()> {
        self.authorize(caller)?;
        self.modules.enable(module)?;
        info!(account = %self.address, module = %module, "module enabled");
        self.emit(AccountEvent::EnabledModule { module });
        Ok(())
    }

    /// Disable `module`.
    pub fn disable_module(&mut self, caller: Address, module: Address) -> AccountResult<()> {
        self.authorize(caller)?;
        self.modules.disable(module)?;
        info!(account = %self.address, module = %module, "module disabled");
        self.emit(AccountEvent::DisabledModule { module });
        Ok(())
    }

    /// Set or clear the fallback handler.
    pub fn set_fallback_handler(
        &mut self,
        caller: Address,
        handler: Option<Address>,
    ) -> AccountResult<()> {
        self.authorize(caller)?;
        if handler == Some(self.address) {
            return Err(AccountError::decode("account cannot be its own fallback handler"));
        }
        self.fallback_handler = handler.filter(|handler| !handler.is_zero());
        info!(account = %self.address, handler = ?self.fallback_handler, "fallback handler changed");
        self.emit(AccountEvent::ChangedFallbackHandler {
            handler: self.fallback_handler,
        });
        Ok(())
    }

    /// Credit `value` from `from` to the account.
    pub fn deposit(&self, host: &mut dyn Host, from: Address, value: U256) -> AccountResult<()> {
        host.transfer(from, self.address, value)
    }

    // ------------------------------------------------------------------------
    // Gates and plumbing
    // ------------------------------------------------------------------------

    pub(crate) fn ensure_initialized(&self) -> AccountResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(AccountError::NotInitialized)
        }
    }

    /// Owner gate.
    pub(crate) fn authorize(&self, caller: Address) -> AccountResult<()> {
        self.ensure_initialized()?;
        if caller == self.address || (self.owners.threshold() == 1 && self.owners.is_owner(caller)) {
            return Ok(());
        }
        warn!(account = %self.address, caller = %caller, "owner gate rejected caller");
        Err(AccountError::Unauthorized { caller })
    }

    pub(crate) fn require_from_entry_point(&self, caller: Address) -> AccountResult<()> {
        self.ensure_initialized()?;
        self.entry_point.require_from_entry_point(caller)
    }

    pub(crate) fn require_module(&self, caller: Address) -> AccountResult<()> {
        self.ensure_initialized()?;
        self.modules.require_enabled(caller)
    }

    pub(crate) fn owner_registry(&self) -> &OwnerRegistry {
        &self.owners
    }

    pub(crate) fn user_op_nonce_mut(&mut self) -> &mut NonceSequencer {
        &mut self.nonce
    }

    pub(crate) fn transaction_nonce_mut(&mut self) -> &mut NonceSequencer {
        &mut self.tx_nonce
    }

    pub(crate) fn emit(&mut self, event: AccountEvent) {
        self.events.push(event);
    }

    fn emit_threshold_change(&mut self, previous: usize) {
        let threshold = self.owners.threshold();
        if threshold != previous {
            self.emit(AccountEvent::ChangedThreshold { threshold });
        }
    }

    /// Run `f` as one all-or-nothing unit.
    ///
    /// Account and ledger are checkpointed before `f` runs; if it fails both
    /// are restored and the error is returned unchanged.
    pub fn transact<T>(
        &mut self,
        host: &mut dyn Host,
        f: impl FnOnce(&mut Self, &mut dyn Host) -> AccountResult<T>,
    ) -> AccountResult<T> {
        let snapshot = self.clone();
        let checkpoint = host.checkpoint();
        match f(self, &mut *host) {
            Ok(value) => {
                host.commit(checkpoint);
                Ok(value)
            }
            Err(err) => {
                host.revert_to(checkpoint);
                *self = snapshot;
                Err(err)
            }
        }
    }
}
