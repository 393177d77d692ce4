//! Entry-point authorization boundary.

use alloy::primitives::Address;
use tracing::warn;

use crate::error::{AccountError, AccountResult};

/// The single address allowed to submit user operations and drive
/// entry-point execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryPointGate {
    entry_point: Address,
}

impl EntryPointGate {
    /// Create a gate for `entry_point`.
    pub fn new(entry_point: Address) -> AccountResult<Self> {
        if entry_point.is_zero() {
            return Err(AccountError::InvalidEntryPoint);
        }
        Ok(Self { entry_point })
    }

    /// The active entry point.
    #[must_use]
    pub const fn entry_point(&self) -> Address {
        self.entry_point
    }

    /// Replace the entry point immediately, returning the previous one.
    pub fn update(&mut self, entry_point: Address) -> AccountResult<Address> {
        if entry_point.is_zero() {
            return Err(AccountError::InvalidEntryPoint);
        }
        Ok(std::mem::replace(&mut self.entry_point, entry_point))
    }

    /// Fail with [`AccountError::EntryPointInvalid`] unless `caller` is the entry point.
    pub fn require_from_entry_point(&self, caller: Address) -> AccountResult<()> {
        if caller == self.entry_point && !caller.is_zero() {
            return Ok(());
        }
        warn!(caller = %caller, entry_point = %self.entry_point, "caller is not the entry point");
        Err(AccountError::EntryPointInvalid {
            caller,
            expected: self.entry_point,
        })
    }
}
