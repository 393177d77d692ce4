//! ABI surface of the account.
//!
//! Payloads addressed to the account are ABI-encoded calls of
//! [`IQuorumAccount`]. [`Account::handle_call`] is the external entry point;
//! it credits attached value and then dispatches by selector. Selectors
//! outside the interface go to the fallback handler when one is set.

use alloy::primitives::{Address, Bytes, U256, hex};
use alloy::sol;
use alloy::sol_types::{SolInterface, SolValue};
use tracing::debug;

use crate::account::Account;
use crate::error::{AccountError, AccountResult};
use crate::execution::{BatchItem, CallKind};
use crate::ledger::Host;

sol! {
    /// ABI form of a batch item.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    struct BatchCall {
        address target;
        uint256 value;
        bytes data;
        uint8 operation;
    }

    /// Callable interface of a quorum account.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    interface IQuorumAccount {
        function addOwnerWithThreshold(address owner, uint256 threshold) external;
        function removeOwner(address owner, uint256 threshold) external;
        function swapOwner(address oldOwner, address newOwner) external;
        function changeThreshold(uint256 threshold) external;
        function enableModule(address module) external;
        function disableModule(address module) external;
        function updateEntryPoint(address entryPoint) external;
        function setFallbackHandler(address handler) external;

        function executeUserOperationAsEntryPoint(address target, uint256 value, bytes data, uint8 operation) external returns (bytes);
        function executeMultipleUserOperationsAsEntryPoint(BatchCall[] calls) external returns (bytes[]);
        function execTransactionFromModule(address to, uint256 value, bytes data, uint8 operation) external returns (bool success);
        function execTransactionFromModuleReturnData(address to, uint256 value, bytes data, uint8 operation) external returns (bool success, bytes returnData);

        function isOwner(address owner) external view returns (bool);
        function getOwners() external view returns (address[]);
        function getThreshold() external view returns (uint256);
        function nonce() external view returns (uint256);
        function entryPoint() external view returns (address);
        function isModuleEnabled(address module) external view returns (bool);
        function getModules() external view returns (address[]);
    }
}

use IQuorumAccount::IQuorumAccountCalls as Calls;

impl TryFrom<BatchCall> for BatchItem {
    type Error = AccountError;

    fn try_from(call: BatchCall) -> AccountResult<Self> {
        Ok(Self {
            target: call.target,
            value: call.value,
            data: call.data,
            kind: CallKind::try_from(call.operation)?,
        })
    }
}

impl From<&BatchItem> for BatchCall {
    fn from(item: &BatchItem) -> Self {
        Self {
            target: item.target,
            value: item.value,
            data: item.data.clone(),
            operation: item.kind.into(),
        }
    }
}

fn threshold_arg(threshold: U256, owners: usize) -> AccountResult<usize> {
    usize::try_from(threshold).map_err(|_| AccountError::invalid_threshold(threshold, owners))
}

impl Account {
    /// Handle an external call: credit `value` from `caller`, then dispatch `data`.
    ///
    /// All-or-nothing: on error the value is returned and no state changes.
    pub fn handle_call(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        value: U256,
        data: &Bytes,
    ) -> AccountResult<Bytes> {
        self.transact(host, |account, host| {
            account.deposit(host, caller, value)?;
            account.dispatch(caller, host, data)
        })
    }

    /// Decode `data` and run the matching operation as `caller`.
    pub(crate) fn dispatch(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        data: &Bytes,
    ) -> AccountResult<Bytes> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| AccountError::decode(format!("{} byte payload", data.len())))?;

        if !Calls::valid_selector(selector) {
            return self.fallback(caller, host, selector, data);
        }

        let call = Calls::abi_decode(data).map_err(|e| AccountError::decode(e.to_string()))?;
        debug!(account = %self.address(), caller = %caller, selector = %hex::encode(selector), "dispatch");

        let output = match call {
            Calls::addOwnerWithThreshold(c) => {
                let threshold = threshold_arg(c.threshold, self.owners().len() + 1)?;
                self.add_owner_with_threshold(caller, c.owner, threshold)?;
                Bytes::new()
            }
            Calls::removeOwner(c) => {
                let threshold = threshold_arg(c.threshold, self.owners().len().saturating_sub(1))?;
                self.remove_owner(caller, c.owner, threshold)?;
                Bytes::new()
            }
            Calls::swapOwner(c) => {
                self.swap_owner(caller, c.oldOwner, c.newOwner)?;
                Bytes::new()
            }
            Calls::changeThreshold(c) => {
                let threshold = threshold_arg(c.threshold, self.owners().len())?;
                self.change_threshold(caller, threshold)?;
                Bytes::new()
            }
            Calls::enableModule(c) => {
                self.enable_module(caller, c.module)?;
                Bytes::new()
            }
            Calls::disableModule(c) => {
                self.disable_module(caller, c.module)?;
                Bytes::new()
            }
            Calls::updateEntryPoint(c) => {
                self.update_entry_point(caller, c.entryPoint)?;
                Bytes::new()
            }
            Calls::setFallbackHandler(c) => {
                self.set_fallback_handler(caller, Some(c.handler))?;
                Bytes::new()
            }
            Calls::executeUserOperationAsEntryPoint(c) => {
                let kind = CallKind::try_from(c.operation)?;
                self.execute_user_operation_as_entry_point(
                    caller, host, c.target, c.value, &c.data, kind,
                )?
                .abi_encode()
                .into()
            }
            Calls::executeMultipleUserOperationsAsEntryPoint(c) => {
                let items = c
                    .calls
                    .into_iter()
                    .map(BatchItem::try_from)
                    .collect::<AccountResult<Vec<_>>>()?;
                self.execute_multiple_user_operations_as_entry_point(caller, host, &items)?
                    .abi_encode()
                    .into()
            }
            Calls::execTransactionFromModule(c) => {
                let kind = CallKind::try_from(c.operation)?;
                self.exec_transaction_from_module(caller, host, c.to, c.value, &c.data, kind)?
                    .abi_encode()
                    .into()
            }
            Calls::execTransactionFromModuleReturnData(c) => {
                let kind = CallKind::try_from(c.operation)?;
                self.exec_transaction_from_module_return_data(
                    caller, host, c.to, c.value, &c.data, kind,
                )?
                .abi_encode_params()
                .into()
            }
            Calls::isOwner(c) => self.is_owner(c.owner).abi_encode().into(),
            Calls::getOwners(_) => self.owners().to_vec().abi_encode().into(),
            Calls::getThreshold(_) => U256::from(self.threshold()).abi_encode().into(),
            Calls::nonce(_) => self.nonce().abi_encode().into(),
            Calls::entryPoint(_) => self.entry_point().abi_encode().into(),
            Calls::isModuleEnabled(c) => self.is_module_enabled(c.module).abi_encode().into(),
            Calls::getModules(_) => self.modules().to_vec().abi_encode().into(),
        };
        Ok(output)
    }

    /// Forward an unknown call to the fallback handler with the original
    /// caller appended to the payload.
    fn fallback(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        selector: [u8; 4],
        data: &Bytes,
    ) -> AccountResult<Bytes> {
        let Some(handler) = self.fallback_handler() else {
            return Err(AccountError::UnknownSelector(selector));
        };
        let mut payload = Vec::with_capacity(data.len() + 20);
        payload.extend_from_slice(data);
        payload.extend_from_slice(caller.as_slice());
        debug!(account = %self.address(), handler = %handler, "fallback");
        host.call(self.address(), handler, U256::ZERO, &payload.into())
    }
}
