//! Replay-protection counter.

use alloy::primitives::U256;

use crate::error::{AccountError, AccountResult};

/// Monotonic counter. Each successful consumption advances it by exactly one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonceSequencer {
    current: U256,
}

impl NonceSequencer {
    /// Create a sequencer starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: U256::ZERO,
        }
    }

    /// The nonce the next operation must carry.
    #[must_use]
    pub const fn current(&self) -> U256 {
        self.current
    }

    /// Check `nonce` against the current value without consuming it.
    pub fn check(&self, nonce: U256) -> AccountResult<()> {
        if nonce == self.current {
            Ok(())
        } else {
            Err(AccountError::NonceMismatch {
                expected: self.current,
                actual: nonce,
            })
        }
    }

    /// Consume `expected`, advancing the counter by one.
    ///
    /// Nothing changes on mismatch.
    pub fn consume(&mut self, expected: U256) -> AccountResult<()> {
        self.check(expected)?;
        self.current += U256::from(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_advances_by_one() {
        let mut nonce = NonceSequencer::new();
        nonce.consume(U256::ZERO).unwrap();
        nonce.consume(U256::from(1)).unwrap();
        assert_eq!(nonce.current(), U256::from(2));
    }

    #[test]
    fn test_mismatch_leaves_counter_alone() {
        let mut nonce = NonceSequencer::new();
        nonce.consume(U256::ZERO).unwrap();

        let stale = nonce.consume(U256::ZERO).unwrap_err();
        assert_eq!(
            stale,
            AccountError::NonceMismatch {
                expected: U256::from(1),
                actual: U256::ZERO,
            }
        );
        assert!(nonce.consume(U256::from(5)).is_err());
        assert_eq!(nonce.current(), U256::from(1));
    }
}
