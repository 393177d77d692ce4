//! User operation validation.
//!
//! Validation has two failure tiers. Gate violations and prefund shortfalls
//! are hard errors that abort the call. A bad signature, a stale or future
//! nonce, a hash that does not match, or an operation addressed to another
//! account are soft: the call succeeds and returns [`ValidationData`] with
//! the signature-failed marker, leaving the account untouched.

use alloy::primitives::{Address, B256, U256};
use tracing::debug;

use super::UserOperation;
use crate::account::{Account, AccountEvent};
use crate::error::{AccountResult, SignatureError};
use crate::ledger::Host;
use crate::signature::recover_signers;

/// Aggregator value that marks a failed signature check.
pub const SIG_VALIDATION_FAILED: u64 = 1;

/// Verdict returned to the entry point, packed as
/// `aggregator | validUntil << 160 | validAfter << 208`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationData {
    /// Aggregator address; `address(1)` marks a failed signature.
    pub aggregator: Address,
    /// Last timestamp the operation is valid at (0 = no limit).
    pub valid_until: u64,
    /// First timestamp the operation is valid at.
    pub valid_after: u64,
}

impl ValidationData {
    /// Successful validation with no time bounds.
    pub const SUCCESS: Self = Self {
        aggregator: Address::ZERO,
        valid_until: 0,
        valid_after: 0,
    };

    /// Failed validation.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            aggregator: Address::with_last_byte(1),
            ..Self::SUCCESS
        }
    }

    /// Check if the verdict is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.aggregator.is_zero()
    }

    /// Packed numeric verdict: 0 for success.
    #[must_use]
    pub fn pack(&self) -> U256 {
        let valid_until = self.valid_until & 0xffff_ffff_ffff;
        let valid_after = self.valid_after & 0xffff_ffff_ffff;
        U256::from_be_slice(self.aggregator.as_slice())
            | (U256::from(valid_until) << 160)
            | (U256::from(valid_after) << 208)
    }
}

/// Why a user operation was rejected softly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationFailure {
    /// The operation targets another account.
    #[error("operation is for {sender}, not {account}")]
    WrongSender {
        /// Sender in the operation.
        sender: Address,
        /// This account.
        account: Address,
    },

    /// The supplied hash is not the canonical hash of the operation.
    #[error("hash mismatch: supplied {supplied}, computed {computed}")]
    HashMismatch {
        /// Hash handed in by the entry point.
        supplied: B256,
        /// Hash recomputed by the account.
        computed: B256,
    },

    /// Signatures could not be decoded.
    #[error("signature: {0}")]
    Signature(#[from] SignatureError),

    /// Too few distinct owners signed.
    #[error("{approvals} of {threshold} owner approvals")]
    ThresholdNotMet {
        /// Distinct owners that signed.
        approvals: usize,
        /// Configured threshold.
        threshold: usize,
    },

    /// Nonce is not the current one.
    #[error("nonce mismatch: expected {expected}, got {actual}")]
    NonceMismatch {
        /// The current nonce.
        expected: U256,
        /// The nonce in the operation.
        actual: U256,
    },
}

impl Account {
    /// Canonical hash of `op` for this account's entry point on the host chain.
    #[must_use]
    pub fn user_op_hash(&self, op: &UserOperation, host: &dyn Host) -> B256 {
        op.hash(self.entry_point(), host.chain_id())
    }

    /// Validate `op` on behalf of the entry point.
    ///
    /// Only the current entry point may call this. On success the nonce
    /// advances by one and `missing_account_funds` is paid to the entry point;
    /// if the account cannot pay, the whole call fails and nothing changes.
    /// Signature, nonce, hash and sender problems return a failed verdict
    /// without touching state.
    pub fn validate_user_op(
        &mut self,
        caller: Address,
        host: &mut dyn Host,
        op: &UserOperation,
        op_hash: B256,
        missing_account_funds: U256,
    ) -> AccountResult<ValidationData> {
        self.require_from_entry_point(caller)?;

        if let Err(failure) = self.check_user_op(op, op_hash, host.chain_id()) {
            debug!(
                account = %self.address(),
                nonce = %op.nonce,
                reason = %failure,
                "user operation rejected",
            );
            return Ok(ValidationData::failed());
        }

        self.transact(host, |account, host| {
            account.user_op_nonce_mut().consume(op.nonce)?;
            if !missing_account_funds.is_zero() {
                host.transfer(account.address(), caller, missing_account_funds)?;
            }
            account.emit(AccountEvent::UserOperationValidated {
                user_op_hash: op_hash,
                nonce: op.nonce,
            });
            Ok(())
        })?;

        debug!(
            account = %self.address(),
            nonce = %op.nonce,
            prefund = %missing_account_funds,
            "user operation validated",
        );
        Ok(ValidationData::SUCCESS)
    }

    /// Run every soft check against `op`.
    pub fn check_user_op(
        &self,
        op: &UserOperation,
        op_hash: B256,
        chain_id: u64,
    ) -> Result<(), ValidationFailure> {
        if op.sender != self.address() {
            return Err(ValidationFailure::WrongSender {
                sender: op.sender,
                account: self.address(),
            });
        }

        let computed = op.hash(self.entry_point(), chain_id);
        if computed != op_hash {
            return Err(ValidationFailure::HashMismatch {
                supplied: op_hash,
                computed,
            });
        }

        let signers = recover_signers(computed, &op.signature)?;
        let approvals = self.owner_registry().count_approvals(&signers);
        let threshold = self.threshold();
        if approvals < threshold {
            return Err(ValidationFailure::ThresholdNotMet {
                approvals,
                threshold,
            });
        }

        let expected = self.nonce();
        if op.nonce != expected {
            return Err(ValidationFailure::NonceMismatch {
                expected,
                actual: op.nonce,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Bytes;

    use super::*;
    use crate::error::AccountError;
    use crate::test_utils::{ACCOUNT, CHAIN_ID, ENTRY_POINT, Fixture, sign_eth_message, sign_hash};

    fn prefunded(owners: usize, threshold: usize) -> Fixture {
        let mut fixture = Fixture::new(owners, threshold);
        fixture.ledger.fund(ACCOUNT, U256::from(1_000));
        fixture
    }

    #[test]
    fn test_validation_data_packing() {
        assert_eq!(ValidationData::SUCCESS.pack(), U256::ZERO);
        assert_eq!(
            ValidationData::failed().pack(),
            U256::from(SIG_VALIDATION_FAILED)
        );
        assert!(!ValidationData::failed().is_success());

        let bounded = ValidationData {
            valid_until: 2,
            valid_after: 1,
            ..ValidationData::SUCCESS
        };
        assert_eq!(
            bounded.pack(),
            (U256::from(2) << 160) | (U256::from(1) << 208)
        );
    }

    #[test]
    fn test_success_then_replay() {
        let mut f = prefunded(1, 1);
        let (op, hash) = f.signed_op(0, Bytes::new(), &[0]);

        let verdict = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::ZERO)
            .unwrap();
        assert_eq!(verdict.pack(), U256::ZERO);
        assert_eq!(f.account.nonce(), U256::from(1));

        let replay = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::ZERO)
            .unwrap();
        assert_eq!(replay.pack(), U256::from(SIG_VALIDATION_FAILED));
        assert_eq!(f.account.nonce(), U256::from(1));
        assert_eq!(
            f.account.check_user_op(&op, hash, CHAIN_ID),
            Err(ValidationFailure::NonceMismatch {
                expected: U256::from(1),
                actual: U256::ZERO,
            })
        );
    }

    #[test]
    fn test_non_entry_point_caller_is_hard_failure() {
        let mut f = prefunded(1, 1);
        let (op, hash) = f.signed_op(0, Bytes::new(), &[0]);
        let owner = f.owners[0];

        let err = f
            .account
            .validate_user_op(owner, &mut f.ledger, &op, hash, U256::ZERO)
            .unwrap_err();
        assert_eq!(
            err,
            AccountError::EntryPointInvalid {
                caller: owner,
                expected: ENTRY_POINT,
            }
        );
        assert_eq!(f.account.nonce(), U256::ZERO);
    }

    #[test]
    fn test_future_nonce_is_soft_failure() {
        let mut f = prefunded(1, 1);
        let (op, hash) = f.signed_op(3, Bytes::new(), &[0]);

        let verdict = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::from(5))
            .unwrap();
        assert!(!verdict.is_success());
        assert_eq!(f.account.nonce(), U256::ZERO);
        assert_eq!(f.ledger.balance(ACCOUNT), U256::from(1_000));
    }

    #[test]
    fn test_non_owner_signature_fails() {
        let mut f = prefunded(2, 1);
        let stranger = crate::test_utils::signer(4);
        let op = f.unsigned_op(0, Bytes::new());
        let hash = f.account.user_op_hash(&op, &f.ledger);
        let op = op.with_signature(sign_hash(&[&stranger], hash));

        let verdict = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::ZERO)
            .unwrap();
        assert!(!verdict.is_success());
        assert_eq!(f.account.nonce(), U256::ZERO);
    }

    #[test]
    fn test_quorum_counts_distinct_owners() {
        let mut f = prefunded(3, 2);
        let op = f.unsigned_op(0, Bytes::new());
        let hash = f.account.user_op_hash(&op, &f.ledger);

        let twice = op
            .clone()
            .with_signature(sign_hash(&[&f.signers[0], &f.signers[0]], hash));
        assert_eq!(
            f.account.check_user_op(&twice, hash, CHAIN_ID),
            Err(ValidationFailure::ThresholdNotMet {
                approvals: 1,
                threshold: 2,
            })
        );

        let quorum = op.with_signature(sign_hash(&[&f.signers[2], &f.signers[0]], hash));
        let verdict = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &quorum, hash, U256::ZERO)
            .unwrap();
        assert!(verdict.is_success());
        assert_eq!(f.account.nonce(), U256::from(1));
    }

    #[test]
    fn test_eth_signed_message_signature() {
        let mut f = prefunded(1, 1);
        let op = f.unsigned_op(0, Bytes::new());
        let hash = f.account.user_op_hash(&op, &f.ledger);
        let op = op.with_signature(sign_eth_message(&f.signers[0], hash));

        let verdict = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::ZERO)
            .unwrap();
        assert!(verdict.is_success());
    }

    #[test]
    fn test_hash_and_sender_are_checked() {
        let mut f = prefunded(1, 1);
        let (op, hash) = f.signed_op(0, Bytes::new(), &[0]);

        let wrong_hash = B256::repeat_byte(0x01);
        assert!(matches!(
            f.account.check_user_op(&op, wrong_hash, CHAIN_ID),
            Err(ValidationFailure::HashMismatch { .. })
        ));
        assert!(matches!(
            f.account.check_user_op(&op, hash, CHAIN_ID + 1),
            Err(ValidationFailure::HashMismatch { .. })
        ));

        let other = UserOperation {
            sender: Address::repeat_byte(0x77),
            ..op
        };
        let verdict = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &other, hash, U256::ZERO)
            .unwrap();
        assert!(!verdict.is_success());
        assert_eq!(f.account.nonce(), U256::ZERO);
    }

    #[test]
    fn test_prefund_is_paid_to_entry_point() {
        let mut f = prefunded(1, 1);
        let (op, hash) = f.signed_op(0, Bytes::new(), &[0]);

        f.account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::from(1))
            .unwrap();

        assert_eq!(f.ledger.balance(ENTRY_POINT), U256::from(1));
        assert_eq!(f.ledger.balance(ACCOUNT), U256::from(999));
        assert!(matches!(
            f.account.events().last(),
            Some(AccountEvent::UserOperationValidated { .. })
        ));
    }

    #[test]
    fn test_insufficient_prefund_aborts_everything() {
        let mut f = prefunded(1, 1);
        let (op, hash) = f.signed_op(0, Bytes::new(), &[0]);
        let events = f.account.events().len();

        let err = f
            .account
            .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::from(5_000))
            .unwrap_err();

        assert_eq!(
            err,
            AccountError::InsufficientFunds {
                required: U256::from(5_000),
                available: U256::from(1_000),
            }
        );
        assert_eq!(f.account.nonce(), U256::ZERO);
        assert_eq!(f.account.events().len(), events);
        assert_eq!(f.ledger.balance(ENTRY_POINT), U256::ZERO);
    }

    #[test]
    fn test_rotated_entry_point_loses_rights() {
        let mut f = prefunded(2, 1);
        let new_entry_point = Address::repeat_byte(0xe2);
        let owner = f.owners[1];
        f.account.update_entry_point(owner, new_entry_point).unwrap();

        let op = f.unsigned_op(0, Bytes::new());
        let hash = f.account.user_op_hash(&op, &f.ledger);
        let op = op.with_signature(sign_hash(&[&f.signers[0]], hash));

        assert!(matches!(
            f.account
                .validate_user_op(ENTRY_POINT, &mut f.ledger, &op, hash, U256::ZERO),
            Err(AccountError::EntryPointInvalid { .. })
        ));
        let verdict = f
            .account
            .validate_user_op(new_entry_point, &mut f.ledger, &op, hash, U256::ZERO)
            .unwrap();
        assert!(verdict.is_success());
    }
}
