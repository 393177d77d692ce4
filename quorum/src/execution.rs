//! Execution paths.
//!
//! Three callers can make the account act:
//!
//! ```text
//! entry point   execute_user_operation_as_entry_point / execute_multiple_…
//! module        exec_transaction_from_module[_return_data]
//! anyone        exec_transaction (with owner signatures reaching the threshold)
//! ```
//!
//! All of them funnel into [`Account::execute`], the single-call primitive.
//! An ordinary call to the account's own address is dispatched through the
//! account ABI with the account as caller, which is how these paths reach
//! owner-gated operations.

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::sol;
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::account::{Account, AccountEvent};
use crate::error::{AccountError, AccountResult};
use crate::ledger::{Host, revert_reason};
use crate::signature::recover_signers;

sol! {
    #[allow(missing_docs)]
    struct TransactionPacked {
        address to;
        uint256 value;
        bytes32 dataHash;
        uint8 operation;
        uint256 nonce;
    }

    #[allow(missing_docs)]
    struct TransactionHashEncoded {
        bytes32 encodedHash;
        address account;
        uint256 chainId;
    }
}

/// Execution context of a sub-call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum CallKind {
    /// Ordinary call: the target runs in its own context.
    #[default]
    Call = 0,
    /// Delegated call: the target's code runs in the account's context.
    DelegateCall = 1,
}

impl TryFrom<u8> for CallKind {
    type Error = AccountError;

    fn try_from(value: u8) -> AccountResult<Self> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::DelegateCall),
            other => Err(AccountError::decode(format!("invalid operation {other}"))),
        }
    }
}

impl From<CallKind> for u8 {
    fn from(kind: CallKind) -> Self {
        kind as Self
    }
}

/// One sub-call of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// Address to call.
    pub target: Address,
    /// Native value to forward.
    #[serde(default)]
    pub value: U256,
    /// Call payload.
    #[serde(default)]
    pub data: Bytes,
    /// Execution context.
    #[serde(default)]
    pub kind: CallKind,
}

impl BatchItem {
    /// An ordinary call.
    #[must_use]
    pub fn call(target: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            target,
            value,
            data: data.into(),
            kind: CallKind::Call,
        }
    }

    /// A delegated call.
    #[must_use]
    pub fn delegate_call(target: Address, data: impl Into<Bytes>) -> Self {
        Self {
            target,
            value: U256::ZERO,
            data: data.into(),
            kind: CallKind::DelegateCall,
        }
    }
}

/// Revert data to report for a failed inner call.
fn revert_data(err: &AccountError) -> Bytes {
    match err {
        AccountError::CallReverted { reason, .. } => reason.clone(),
        other => revert_reason(other.to_string()),
    }
}

impl Account {
    /// Single-call primitive.
    ///
    /// `caller` is the caller of the account call being served; it is only
    /// observable by delegated calls, which run with it unchanged.
    pub(crate) fn execute(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        target: Address,
        value: U256,
        data: &Bytes,
        kind: CallKind,
    ) -> AccountResult<Bytes> {
        let account = self.address();
        debug!(account = %account, target = %target, value = %value, ?kind, "execute");
        match kind {
            CallKind::Call if target == account => self.dispatch(account, host, data),
            CallKind::Call => host.call(account, target, value, data),
            CallKind::DelegateCall if target == account => self.dispatch(caller, host, data),
            CallKind::DelegateCall => match host.library(target) {
                Some(library) => library.delegate_call(self, caller, host, data),
                None => Ok(Bytes::new()),
            },
        }
    }

    /// Execute one call on behalf of the entry point.
    ///
    /// Revert data of a failed sub-call is propagated unchanged.
    pub fn execute_user_operation_as_entry_point(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        target: Address,
        value: U256,
        data: &Bytes,
        kind: CallKind,
    ) -> AccountResult<Bytes> {
        self.require_from_entry_point(caller)?;
        self.transact(host, |account, host| {
            account.execute(caller, host, target, value, data, kind)
        })
    }

    /// Execute `items` in order as one atomic unit on behalf of the entry point.
    ///
    /// Either every item applies or none does. The first failure is reported
    /// as [`AccountError::BatchTransactionsFailed`] carrying its index.
    pub fn execute_multiple_user_operations_as_entry_point(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        items: &[BatchItem],
    ) -> AccountResult<Vec<Bytes>> {
        self.require_from_entry_point(caller)?;
        let result = self.transact(host, |account, host| {
            let mut outputs = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let output = account
                    .execute(caller, host, item.target, item.value, &item.data, item.kind)
                    .map_err(|err| AccountError::batch_failed(index, err))?;
                outputs.push(output);
            }
            Ok(outputs)
        });

        if let Err(err) = &result {
            warn!(account = %self.address(), items = items.len(), error = %err, "batch rolled back");
        }
        result
    }

    /// Execute a call requested by an enabled module.
    ///
    /// Returns `false` when the inner call fails; its effects are rolled back.
    pub fn exec_transaction_from_module(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        target: Address,
        value: U256,
        data: &Bytes,
        kind: CallKind,
    ) -> AccountResult<bool> {
        self.exec_transaction_from_module_return_data(caller, host, target, value, data, kind)
            .map(|(success, _)| success)
    }

    /// Like [`exec_transaction_from_module`](Self::exec_transaction_from_module),
    /// also returning the call output or revert data.
    pub fn exec_transaction_from_module_return_data(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        target: Address,
        value: U256,
        data: &Bytes,
        kind: CallKind,
    ) -> AccountResult<(bool, Bytes)> {
        self.require_module(caller)?;
        let result = self.transact(host, |account, host| {
            account.execute(caller, host, target, value, data, kind)
        });

        match result {
            Ok(output) => {
                self.emit(AccountEvent::ExecutionFromModuleSuccess { module: caller });
                Ok((true, output))
            }
            Err(err) => {
                warn!(account = %self.address(), module = %caller, error = %err, "module call failed");
                self.emit(AccountEvent::ExecutionFromModuleFailure { module: caller });
                Ok((false, revert_data(&err)))
            }
        }
    }

    /// Hash owners sign to approve `tx` at the current transaction nonce.
    #[must_use]
    pub fn transaction_hash(&self, tx: &BatchItem, chain_id: u64) -> B256 {
        let packed = TransactionPacked {
            to: tx.target,
            value: tx.value,
            dataHash: keccak256(&tx.data),
            operation: tx.kind.into(),
            nonce: self.transaction_nonce(),
        };
        let encoded = TransactionHashEncoded {
            encodedHash: keccak256(packed.abi_encode()),
            account: self.address(),
            chainId: U256::from(chain_id),
        };
        keccak256(encoded.abi_encode())
    }

    /// Execute `tx` approved by owner `signatures`.
    ///
    /// Anyone may submit. Distinct owner signers must reach the threshold;
    /// the transaction nonce advances on success.
    pub fn exec_transaction(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        tx: &BatchItem,
        signatures: &[u8],
    ) -> AccountResult<Bytes> {
        self.ensure_initialized()?;
        let tx_hash = self.transaction_hash(tx, host.chain_id());
        let signers = recover_signers(tx_hash, signatures)?;
        let approvals = self.owner_registry().count_approvals(&signers);
        let threshold = self.threshold();
        if approvals < threshold {
            warn!(account = %self.address(), approvals, threshold, "transaction lacks quorum");
            return Err(AccountError::ThresholdNotMet {
                approvals,
                threshold,
            });
        }

        self.transact(host, |account, host| {
            let nonce = account.transaction_nonce();
            account.transaction_nonce_mut().consume(nonce)?;
            let output = account.execute(caller, host, tx.target, tx.value, &tx.data, tx.kind)?;
            account.emit(AccountEvent::ExecutionSuccess { tx_hash });
            Ok(output)
        })
    }
}
