//! Owner set and approval threshold.
//!
//! Membership is a hash set for lookups plus a vector that keeps insertion
//! order for enumeration. Owner and threshold changes are applied together so
//! no intermediate state ever has `threshold > owners`.

use std::collections::HashSet;

use alloy::primitives::{Address, U256};

use crate::error::{AccountError, AccountResult};

/// Owners of an account and the number of them required to approve.
///
/// Invariant (once set up): `1 <= threshold <= owners.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerRegistry {
    /// Address of the account these owners control.
    account: Address,
    /// Owners in insertion order.
    owners: Vec<Address>,
    /// Membership index over `owners`.
    index: HashSet<Address>,
    /// Required approvals.
    threshold: usize,
}

impl OwnerRegistry {
    /// Build the initial owner set for `account`.
    pub fn new(account: Address, owners: &[Address], threshold: usize) -> AccountResult<Self> {
        let mut registry = Self {
            account,
            ..Self::default()
        };
        for &owner in owners {
            registry.check_new_owner(owner)?;
            registry.index.insert(owner);
            registry.owners.push(owner);
        }
        registry.check_threshold(threshold, registry.owners.len())?;
        registry.threshold = threshold;
        Ok(registry)
    }

    /// Check whether `address` is an owner.
    #[must_use]
    pub fn is_owner(&self, address: Address) -> bool {
        self.index.contains(&address)
    }

    /// Owners in insertion order.
    #[must_use]
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Current approval threshold.
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Check whether the set is empty (only before setup).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Add `owner` and set the threshold to `threshold` in one step.
    pub fn add_owner(&mut self, owner: Address, threshold: usize) -> AccountResult<()> {
        self.check_new_owner(owner)?;
        self.check_threshold(threshold, self.owners.len() + 1)?;
        self.index.insert(owner);
        self.owners.push(owner);
        self.threshold = threshold;
        Ok(())
    }

    /// Remove `owner` and set the threshold to `threshold` in one step.
    ///
    /// Removing the last owner always fails since no threshold fits an empty set.
    pub fn remove_owner(&mut self, owner: Address, threshold: usize) -> AccountResult<()> {
        if !self.is_owner(owner) {
            return Err(AccountError::OwnerNotFound(owner));
        }
        self.check_threshold(threshold, self.owners.len() - 1)?;
        self.index.remove(&owner);
        self.owners.retain(|&existing| existing != owner);
        self.threshold = threshold;
        Ok(())
    }

    /// Replace `old` with `new`, keeping its position and the threshold.
    pub fn swap_owner(&mut self, old: Address, new: Address) -> AccountResult<()> {
        self.check_new_owner(new)?;
        let position = self
            .owners
            .iter()
            .position(|&existing| existing == old)
            .ok_or(AccountError::OwnerNotFound(old))?;
        self.index.remove(&old);
        self.index.insert(new);
        self.owners[position] = new;
        Ok(())
    }

    /// Change the threshold, keeping the owner set.
    pub fn change_threshold(&mut self, threshold: usize) -> AccountResult<()> {
        self.check_threshold(threshold, self.owners.len())?;
        self.threshold = threshold;
        Ok(())
    }

    /// Count the distinct owners among `signers`.
    #[must_use]
    pub fn count_approvals(&self, signers: &[Address]) -> usize {
        let mut seen = HashSet::with_capacity(signers.len());
        signers
            .iter()
            .filter(|signer| self.is_owner(**signer) && seen.insert(**signer))
            .count()
    }

    fn check_new_owner(&self, owner: Address) -> AccountResult<()> {
        if owner.is_zero() || owner == self.account {
            return Err(AccountError::InvalidOwner(owner));
        }
        if self.is_owner(owner) {
            return Err(AccountError::OwnerAlreadyExists(owner));
        }
        Ok(())
    }

    #[allow(clippy::unused_self)]
    fn check_threshold(&self, threshold: usize, owners: usize) -> AccountResult<()> {
        if threshold == 0 || threshold > owners {
            return Err(AccountError::invalid_threshold(U256::from(threshold), owners));
        }
        Ok(())
    }
}
