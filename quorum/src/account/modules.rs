//! Pluggable execution rights.
//!
//! A module is either Disabled (the initial state) or Enabled. Only an
//! enabled module may drive execution through the account.

use alloy::primitives::Address;
use tracing::warn;

use crate::error::{AccountError, AccountResult};

/// Enabled modules of an account, in the order they were enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleManager {
    account: Address,
    modules: Vec<Address>,
}

impl ModuleManager {
    /// Create an empty manager for `account`.
    #[must_use]
    pub const fn new(account: Address) -> Self {
        Self {
            account,
            modules: Vec::new(),
        }
    }

    /// Check whether `module` is enabled.
    #[must_use]
    pub fn is_enabled(&self, module: Address) -> bool {
        self.modules.contains(&module)
    }

    /// Enabled modules.
    #[must_use]
    pub fn modules(&self) -> &[Address] {
        &self.modules
    }

    /// Transition `module` from Disabled to Enabled.
    pub fn enable(&mut self, module: Address) -> AccountResult<()> {
        if module.is_zero() || module == self.account {
            return Err(AccountError::InvalidModule(module));
        }
        if self.is_enabled(module) {
            return Err(AccountError::ModuleAlreadyEnabled(module));
        }
        self.modules.push(module);
        Ok(())
    }

    /// Transition `module` from Enabled to Disabled.
    pub fn disable(&mut self, module: Address) -> AccountResult<()> {
        let position = self
            .modules
            .iter()
            .position(|&enabled| enabled == module)
            .ok_or(AccountError::ModuleNotEnabled(module))?;
        self.modules.remove(position);
        Ok(())
    }

    /// Fail with [`AccountError::ModuleNotEnabled`] unless `caller` is an enabled module.
    pub fn require_enabled(&self, caller: Address) -> AccountResult<()> {
        if self.is_enabled(caller) {
            return Ok(());
        }
        warn!(caller = %caller, "caller is not an enabled module");
        Err(AccountError::ModuleNotEnabled(caller))
    }
}
