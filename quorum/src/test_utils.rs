//! Shared fixtures for unit tests.

use alloy::primitives::{Address, B256, Bytes, U256, address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signer, SignerSync};
use alloy::sol_types::SolValue;

use crate::account::Account;
use crate::config::AccountConfig;
use crate::error::{AccountError, AccountResult};
use crate::ledger::{CallContext, Contract, Host, InMemoryLedger, Library, revert_reason};
use crate::signature::pack_signatures;
use crate::user_op::UserOperation;

/// Local development chain id.
pub(crate) const CHAIN_ID: u64 = 31337;

pub(crate) const ACCOUNT: Address = address!("0xa11ce00000000000000000000000000000000a11");

/// ERC-4337 v0.6 entry point deployment address.
pub(crate) const ENTRY_POINT: Address = address!("0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// Well-known development keys.
const KEYS: [&str; 5] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
    "47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a",
];

/// Install a test-writer subscriber honouring `RUST_LOG`. Safe to call twice.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn signer(index: usize) -> PrivateKeySigner {
    KEYS[index].parse().unwrap()
}

pub(crate) fn signers(count: usize) -> Vec<PrivateKeySigner> {
    (0..count).map(signer).collect()
}

pub(crate) fn addresses(signers: &[PrivateKeySigner]) -> Vec<Address> {
    signers.iter().map(|signer| signer.address()).collect()
}

/// Packed signatures of `hash` by `signers`, in order.
pub(crate) fn sign_hash(signers: &[&PrivateKeySigner], hash: B256) -> Bytes {
    pack_signatures(
        signers
            .iter()
            .map(|signer| signer.sign_hash_sync(&hash).unwrap()),
    )
}

/// `eth_sign` style signature of `hash`, with `v` moved to 31/32.
pub(crate) fn sign_eth_message(signer: &PrivateKeySigner, hash: B256) -> Bytes {
    let mut raw = signer
        .sign_message_sync(hash.as_slice())
        .unwrap()
        .as_bytes();
    raw[64] += 4;
    Bytes::copy_from_slice(&raw)
}

/// A set-up account on a fresh ledger.
pub(crate) struct Fixture {
    pub(crate) account: Account,
    pub(crate) ledger: InMemoryLedger,
    pub(crate) owners: Vec<Address>,
    pub(crate) signers: Vec<PrivateKeySigner>,
}

impl Fixture {
    /// Account at [`ACCOUNT`] owned by the first `owners` development keys.
    pub(crate) fn new(owners: usize, threshold: usize) -> Self {
        let signers = signers(owners);
        let owners = addresses(&signers);
        let mut ledger = InMemoryLedger::new(CHAIN_ID);
        let mut account = Account::new(ACCOUNT);
        let config = AccountConfig::builder()
            .owners(owners.clone())
            .threshold(threshold)
            .entry_point(ENTRY_POINT)
            .build()
            .unwrap();
        account.setup(owners[0], &mut ledger, &config).unwrap();

        Self {
            account,
            ledger,
            owners,
            signers,
        }
    }

    pub(crate) fn unsigned_op(&self, nonce: u64, call_data: Bytes) -> UserOperation {
        UserOperation {
            sender: ACCOUNT,
            nonce: U256::from(nonce),
            call_data,
            call_gas_limit: U256::from(100_000),
            verification_gas_limit: U256::from(200_000),
            pre_verification_gas: U256::from(21_000),
            max_fee_per_gas: U256::from(1_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            ..UserOperation::default()
        }
    }

    /// Operation signed by the owners at `by`, with its hash.
    pub(crate) fn signed_op(
        &self,
        nonce: u64,
        call_data: Bytes,
        by: &[usize],
    ) -> (UserOperation, B256) {
        let op = self.unsigned_op(nonce, call_data);
        let hash = self.account.user_op_hash(&op, &self.ledger);
        let signers: Vec<_> = by.iter().map(|&index| &self.signers[index]).collect();
        (op.with_signature(sign_hash(&signers, hash)), hash)
    }
}

/// Counter contract: `increment()` bumps it, an empty payload reads it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Counter {
    count: u64,
}

impl Counter {
    /// `increment()` selector.
    pub(crate) fn increment() -> Bytes {
        Bytes::from_static(&[0xd0, 0x9d, 0xe0, 0x8a])
    }

    pub(crate) fn read(ledger: &mut InMemoryLedger, at: Address) -> u64 {
        let out = ledger.call(Address::ZERO, at, U256::ZERO, &Bytes::new()).unwrap();
        U256::abi_decode(&out).unwrap().to::<u64>()
    }
}

impl Contract for Counter {
    fn call(&mut self, _ctx: CallContext, data: &Bytes) -> Result<Bytes, Bytes> {
        if data.is_empty() {
            return Ok(U256::from(self.count).abi_encode().into());
        }
        if *data == Self::increment() {
            self.count += 1;
            return Ok(Bytes::new());
        }
        Err(revert_reason("unknown function"))
    }

    fn clone_box(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }
}

/// Contract that always reverts with a fixed reason.
#[derive(Debug, Clone)]
pub(crate) struct Reverter {
    reason: String,
}

impl Reverter {
    pub(crate) fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Contract for Reverter {
    fn call(&mut self, _ctx: CallContext, _data: &Bytes) -> Result<Bytes, Bytes> {
        Err(revert_reason(self.reason.as_str()))
    }

    fn clone_box(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }
}

/// Library that enables the ABI-encoded module address it is handed.
#[derive(Debug)]
pub(crate) struct ModuleEnabler;

impl ModuleEnabler {
    pub(crate) fn payload(module: Address) -> Bytes {
        module.abi_encode().into()
    }
}

impl Library for ModuleEnabler {
    fn delegate_call(
        &self,
        account: &mut Account,
        _caller: Address,
        _host: &mut dyn Host,
        data: &Bytes,
    ) -> AccountResult<Bytes> {
        let module =
            Address::abi_decode(data).map_err(|e| AccountError::decode(e.to_string()))?;
        account.enable_module(account.address(), module)?;
        Ok(Bytes::new())
    }
}
