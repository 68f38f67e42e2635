//! # Precompiled Contracts
//!
//! Default [`PrecompileProvider`]. Every address in the fork's precompile
//! range is reported as a precompile; only identity (0x04) and SHA-256
//! (0x02) ship with an implementation. Embedders register the rest with
//! [`StandardPrecompiles::with`].

pub mod identity;
pub mod sha256;

use crate::domain::hardfork::Hardfork;
use crate::domain::services::precompiles;
use crate::domain::value_objects::Address;
use crate::errors::PrecompileError;
use crate::ports::outbound::{PrecompileOutput, PrecompileProvider};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// A single precompiled contract.
pub trait Precompile: Send + Sync {
    /// Execute the precompile with given input.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` if `gas_limit` does not cover the cost, or an input
    /// error for malformed data.
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError>;
}

/// Linear `base + per_word * words(input)` pricing shared by the hash-style
/// precompiles.
pub(crate) fn linear_cost(input_len: usize, base: u64, per_word: u64) -> u64 {
    base + per_word * input_len.div_ceil(32) as u64
}

/// Fork-aware precompile set.
pub struct StandardPrecompiles {
    implementations: HashMap<Address, Box<dyn Precompile>>,
}

impl StandardPrecompiles {
    /// Identity and SHA-256 installed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            implementations: HashMap::new(),
        }
        .with(precompiles::SHA256, sha256::Sha256Precompile)
        .with(precompiles::IDENTITY, identity::Identity)
    }

    /// Installs (or replaces) the implementation at `address`.
    #[must_use]
    pub fn with(mut self, address: Address, precompile: impl Precompile + 'static) -> Self {
        self.implementations.insert(address, Box::new(precompile));
        self
    }
}

impl Default for StandardPrecompiles {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StandardPrecompiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut installed: Vec<_> = self.implementations.keys().collect();
        installed.sort_by_key(|a| a.0);
        f.debug_struct("StandardPrecompiles")
            .field("installed", &installed)
            .finish()
    }
}

impl PrecompileProvider for StandardPrecompiles {
    fn is_precompile(&self, address: &Address, fork: Hardfork) -> bool {
        precompiles::is_active(address, fork)
    }

    fn run(
        &self,
        address: &Address,
        input: &[u8],
        gas_limit: u64,
        fork: Hardfork,
    ) -> Result<PrecompileOutput, PrecompileError> {
        trace!(?address, input_len = input.len(), gas_limit, %fork, "precompile dispatch");
        match self.implementations.get(address) {
            Some(precompile) if self.is_precompile(address, fork) => {
                precompile.execute(input, gas_limit)
            }
            _ => Err(PrecompileError::NotImplemented(*address)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Bytes;

    #[test]
    fn test_identity_dispatch() {
        let provider = StandardPrecompiles::new();
        let out = provider
            .run(&precompiles::IDENTITY, b"hello world", 100_000, Hardfork::Cancun)
            .unwrap();
        assert_eq!(out.output.as_slice(), b"hello world");
        assert_eq!(out.gas_used, 18);
    }

    #[test]
    fn test_range_follows_fork() {
        let provider = StandardPrecompiles::new();
        assert!(provider.is_precompile(&precompiles::BLAKE2F, Hardfork::Istanbul));
        assert!(!provider.is_precompile(&precompiles::BLAKE2F, Hardfork::Petersburg));
        assert!(!provider.is_precompile(&Address::new([1u8; 20]), Hardfork::Cancun));
    }

    #[test]
    fn test_missing_implementation() {
        let provider = StandardPrecompiles::new();
        assert_eq!(
            provider.run(&precompiles::ECRECOVER, &[], 100_000, Hardfork::Cancun),
            Err(PrecompileError::NotImplemented(precompiles::ECRECOVER))
        );
    }

    #[test]
    fn test_custom_implementation() {
        struct Echo;
        impl Precompile for Echo {
            fn execute(&self, input: &[u8], _gas: u64) -> Result<PrecompileOutput, PrecompileError> {
                Ok(PrecompileOutput {
                    gas_used: 1,
                    output: Bytes::from_slice(&input.iter().rev().copied().collect::<Vec<_>>()),
                })
            }
        }

        let provider = StandardPrecompiles::new().with(precompiles::ECRECOVER, Echo);
        let out = provider
            .run(&precompiles::ECRECOVER, &[1, 2], 10, Hardfork::Frontier)
            .unwrap();
        assert_eq!(out.output.as_slice(), &[2, 1]);
    }
}
