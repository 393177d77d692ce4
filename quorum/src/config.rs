//! Account setup configuration.
//!
//! [`AccountConfig`] carries everything the one-time setup needs. It can be
//! built in code with [`AccountConfig::builder`] or loaded from JSON:
//!
//! ```json
//! {
//!   "owners": ["0x70997970C51812dc3A010C7d01b50e0d17dc79C8"],
//!   "threshold": 1,
//!   "entryPoint": "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Delegated call run once during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initializer {
    /// Library to delegate-call.
    pub to: Address,
    /// Calldata handed to the library.
    #[serde(default)]
    pub data: Bytes,
}

/// Parameters of the one-time account setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    /// Initial owners, in order.
    pub owners: Vec<Address>,
    /// Initial approval threshold.
    pub threshold: usize,
    /// Initial entry point.
    pub entry_point: Address,
    /// Handler for calls outside the account ABI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_handler: Option<Address>,
    /// Optional delegated call run during setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Initializer>,
    /// Native amount the account pays out at setup.
    #[serde(default)]
    pub payment: U256,
    /// Receiver of `payment`; defaults to the setup caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_receiver: Option<Address>,
}

impl AccountConfig {
    /// Create a builder for constructing an [`AccountConfig`].
    #[must_use]
    pub fn builder() -> AccountConfigBuilder {
        AccountConfigBuilder::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the owner set, threshold and entry point.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.owners.is_empty() {
            return Err(ConfigError::missing("owners"));
        }
        let mut seen = HashSet::with_capacity(self.owners.len());
        for owner in &self.owners {
            if owner.is_zero() {
                return Err(ConfigError::invalid("owner cannot be the zero address"));
            }
            if !seen.insert(owner) {
                return Err(ConfigError::invalid(format!("duplicate owner {owner}")));
            }
        }
        if self.threshold == 0 || self.threshold > self.owners.len() {
            return Err(ConfigError::invalid(format!(
                "threshold {} outside 1..={}",
                self.threshold,
                self.owners.len()
            )));
        }
        if self.entry_point.is_zero() {
            return Err(ConfigError::invalid("entry point cannot be the zero address"));
        }
        Ok(())
    }
}

/// Builder for [`AccountConfig`].
///
/// # Examples
///
/// ```rust,ignore
/// let config = AccountConfig::builder()
///     .owner(alice)
///     .owner(bob)
///     .threshold(2)
///     .entry_point(entry_point)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct AccountConfigBuilder {
    owners: Vec<Address>,
    threshold: Option<usize>,
    entry_point: Option<Address>,
    fallback_handler: Option<Address>,
    initializer: Option<Initializer>,
    payment: U256,
    payment_receiver: Option<Address>,
}

impl AccountConfigBuilder {
    /// Append one owner.
    #[must_use]
    pub fn owner(mut self, owner: Address) -> Self {
        self.owners.push(owner);
        self
    }

    /// Replace the owner list.
    #[must_use]
    pub fn owners(mut self, owners: impl IntoIterator<Item = Address>) -> Self {
        self.owners = owners.into_iter().collect();
        self
    }

    /// Set the approval threshold.
    #[must_use]
    pub const fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set the entry point.
    #[must_use]
    pub const fn entry_point(mut self, entry_point: Address) -> Self {
        self.entry_point = Some(entry_point);
        self
    }

    /// Set the fallback handler.
    #[must_use]
    pub const fn fallback_handler(mut self, handler: Address) -> Self {
        self.fallback_handler = Some(handler);
        self
    }

    /// Delegate-call `to` with `data` during setup.
    #[must_use]
    pub fn initializer(mut self, to: Address, data: impl Into<Bytes>) -> Self {
        self.initializer = Some(Initializer {
            to,
            data: data.into(),
        });
        self
    }

    /// Pay `amount` to `receiver` (or the setup caller) at setup.
    #[must_use]
    pub const fn payment(mut self, amount: U256, receiver: Option<Address>) -> Self {
        self.payment = amount;
        self.payment_receiver = receiver;
        self
    }

    /// Build and validate the [`AccountConfig`].
    ///
    /// The threshold defaults to 1 when unset. The entry point is required.
    pub fn build(self) -> ConfigResult<AccountConfig> {
        let entry_point = self
            .entry_point
            .ok_or_else(|| ConfigError::missing("entry_point"))?;

        let config = AccountConfig {
            owners: self.owners,
            threshold: self.threshold.unwrap_or(1),
            entry_point,
            fallback_handler: self.fallback_handler,
            initializer: self.initializer,
            payment: self.payment,
            payment_receiver: self.payment_receiver,
        };
        config.validate()?;
        Ok(config)
    }
}
