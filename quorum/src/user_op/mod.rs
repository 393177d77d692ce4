//! User operations and their validation.
//!
//! A [`UserOperation`] is the transient, signed request an entry point hands
//! to the account. Its canonical hash binds every field, the entry point and
//! the chain id:
//!
//! 1. hash the variable-length fields (`initCode`, `callData`, `paymasterAndData`)
//! 2. `encodedHash = keccak256(abi.encode(packed fields))`
//! 3. `hash = keccak256(abi.encode(encodedHash, entryPoint, chainId))`
//!
//! The signature is not part of the hash.

mod validation;

pub use validation::{SIG_VALIDATION_FAILED, ValidationData, ValidationFailure};

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::sol;
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

sol! {
    #[allow(missing_docs)]
    #[derive(Default, Debug, PartialEq, Eq)]
    struct UserOperationHashEncoded {
        bytes32 encodedHash;
        address entryPoint;
        uint256 chainId;
    }

    #[allow(missing_docs)]
    #[derive(Default, Debug, PartialEq, Eq)]
    struct UserOperationPackedForHash {
        address sender;
        uint256 nonce;
        bytes32 hashInitCode;
        bytes32 hashCallData;
        uint256 callGasLimit;
        uint256 verificationGasLimit;
        uint256 preVerificationGas;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        bytes32 hashPaymasterAndData;
    }
}

/// A signed account-abstraction request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Account the operation acts on.
    pub sender: Address,
    /// Must equal the account's current nonce.
    pub nonce: U256,
    /// Deployment code for counterfactual accounts.
    pub init_code: Bytes,
    /// Payload executed after validation.
    pub call_data: Bytes,
    /// Gas for the execution phase.
    pub call_gas_limit: U256,
    /// Gas for the validation phase.
    pub verification_gas_limit: U256,
    /// Gas paid for bundling overhead.
    pub pre_verification_gas: U256,
    /// Fee cap per gas.
    pub max_fee_per_gas: U256,
    /// Priority fee cap per gas.
    pub max_priority_fee_per_gas: U256,
    /// Paymaster address and its data.
    pub paymaster_and_data: Bytes,
    /// Concatenated 65-byte owner signatures over the hash.
    pub signature: Bytes,
}

impl From<&UserOperation> for UserOperationPackedForHash {
    fn from(op: &UserOperation) -> Self {
        Self {
            sender: op.sender,
            nonce: op.nonce,
            hashInitCode: keccak256(&op.init_code),
            hashCallData: keccak256(&op.call_data),
            callGasLimit: op.call_gas_limit,
            verificationGasLimit: op.verification_gas_limit,
            preVerificationGas: op.pre_verification_gas,
            maxFeePerGas: op.max_fee_per_gas,
            maxPriorityFeePerGas: op.max_priority_fee_per_gas,
            hashPaymasterAndData: keccak256(&op.paymaster_and_data),
        }
    }
}

impl UserOperation {
    /// Canonical hash of this operation for `entry_point` on `chain_id`.
    #[must_use]
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed = UserOperationPackedForHash::from(self);
        let encoded = UserOperationHashEncoded {
            encodedHash: keccak256(packed.abi_encode()),
            entryPoint: entry_point,
            chainId: U256::from(chain_id),
        };
        keccak256(encoded.abi_encode())
    }

    /// Return a copy carrying `signature`.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = signature.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256, bytes};

    use super::*;

    const ENTRY_POINT_V06: Address = address!("66a15edcc3b50a663e72f1457ffd49b9ae284ddc");

    #[test]
    fn test_hash_zeroed() {
        let op = UserOperation::default();
        assert_eq!(
            op.hash(ENTRY_POINT_V06, 1337),
            b256!("dca97c3b49558ab360659f6ead939773be8bf26631e61bb17045bb70dc983b2d")
        );
    }

    #[test]
    fn test_hash_non_zeroed() {
        let op = UserOperation {
            sender: address!("0x1306b01bc3e4ad202612d3843387e94737673f53"),
            nonce: U256::from(8942),
            init_code: bytes!("6942069420694206942069420694206942069420"),
            call_data: bytes!("0000000000000000000000000000000000000000080085"),
            call_gas_limit: U256::from(10_000),
            verification_gas_limit: U256::from(100_000),
            pre_verification_gas: U256::from(100),
            max_fee_per_gas: U256::from(99_999),
            max_priority_fee_per_gas: U256::from(9_999_999),
            paymaster_and_data: bytes!(
                "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            ),
            signature: bytes!("da0929f527cded8d0a1eaf2e8861d7f7e2d8160b7b13942f99dd367df4473a"),
        };

        assert_eq!(
            op.hash(ENTRY_POINT_V06, 1337),
            b256!("484add9e4d8c3172d11b5feb6a3cc712280e176d278027cfa02ee396eb28afa1")
        );
    }

    #[test]
    fn test_hash_binds_entry_point_chain_and_fields() {
        let op = UserOperation {
            sender: Address::repeat_byte(0x01),
            ..UserOperation::default()
        };
        let base = op.hash(ENTRY_POINT_V06, 1);

        assert_ne!(base, op.hash(Address::repeat_byte(0x02), 1));
        assert_ne!(base, op.hash(ENTRY_POINT_V06, 2));

        let bumped = UserOperation {
            nonce: U256::from(1),
            ..op.clone()
        };
        assert_ne!(base, bumped.hash(ENTRY_POINT_V06, 1));

        let signed = op.with_signature(bytes!("01"));
        assert_eq!(base, signed.hash(ENTRY_POINT_V06, 1));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"
        {
            "sender": "0x1111111111111111111111111111111111111111",
            "nonce": "0x0",
            "initCode": "0x",
            "callData": "0x",
            "callGasLimit": "0x5208",
            "verificationGasLimit": "0x100000",
            "preVerificationGas": "0x10000",
            "maxFeePerGas": "0x59682f10",
            "maxPriorityFeePerGas": "0x3b9aca00",
            "paymasterAndData": "0x",
            "signature": "0x01"
        }
        "#;

        let op: UserOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.sender, Address::repeat_byte(0x11));
        assert_eq!(op.nonce, U256::ZERO);
        assert_eq!(op.call_gas_limit, U256::from(0x5208));
        assert_eq!(op.signature, bytes!("01"));
    }
}
