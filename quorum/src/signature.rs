//! Packed owner signatures.
//!
//! Signatures are concatenated 65-byte `r || s || v` records. The `v` byte
//! selects how the signed digest is formed:
//!
//! | `v`        | digest                                  |
//! |------------|-----------------------------------------|
//! | 27, 28     | the hash itself                         |
//! | 0, 1       | the hash itself (raw parity)            |
//! | 31, 32     | EIP-191 `personal_sign` of the hash     |

use alloy::primitives::{Address, B256, Bytes, Signature, U256, eip191_hash_message};

use crate::error::SignatureError;

/// Length of a single packed signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to `v` for signatures over the EIP-191 message digest.
const ETH_SIGN_V_OFFSET: u8 = 4;

/// Recover the distinct signers of `hash` from a packed signature blob.
///
/// Signers are returned in first-seen order. Whether they are owners is
/// up to the caller.
pub fn recover_signers(hash: B256, signatures: &[u8]) -> Result<Vec<Address>, SignatureError> {
    if signatures.len() % SIGNATURE_LENGTH != 0 {
        return Err(SignatureError::Malformed {
            len: signatures.len(),
        });
    }

    let mut signers = Vec::with_capacity(signatures.len() / SIGNATURE_LENGTH);
    for chunk in signatures.chunks_exact(SIGNATURE_LENGTH) {
        let signer = recover_one(hash, chunk)?;
        if !signers.contains(&signer) {
            signers.push(signer);
        }
    }
    Ok(signers)
}

fn recover_one(hash: B256, chunk: &[u8]) -> Result<Address, SignatureError> {
    let r = U256::from_be_slice(&chunk[..32]);
    let s = U256::from_be_slice(&chunk[32..64]);
    let v = chunk[64];

    let (parity, digest) = match v {
        0 | 1 => (v == 1, hash),
        27 | 28 => (v == 28, hash),
        31 | 32 => (
            v - ETH_SIGN_V_OFFSET == 28,
            eip191_hash_message(hash.as_slice()),
        ),
        other => {
            return Err(SignatureError::Recovery(format!(
                "unsupported v value {other}"
            )));
        }
    };

    Signature::new(r, s, parity)
        .recover_address_from_prehash(&digest)
        .map_err(|e| SignatureError::Recovery(e.to_string()))
}

/// Concatenate signatures into the packed form [`recover_signers`] reads.
pub fn pack_signatures(signatures: impl IntoIterator<Item = Signature>) -> Bytes {
    signatures
        .into_iter()
        .flat_map(|signature| signature.as_bytes())
        .collect::<Vec<u8>>()
        .into()
}
