//! # SHA256 Precompile (0x02)

use super::{linear_cost, Precompile};
use crate::domain::value_objects::Bytes;
use crate::errors::PrecompileError;
use crate::ports::outbound::PrecompileOutput;
use sha2::{Digest, Sha256};

/// Base gas cost.
const SHA256_BASE_COST: u64 = 60;
/// Gas cost per word.
const SHA256_WORD_COST: u64 = 12;

/// SHA256 precompile.
pub struct Sha256Precompile;

impl Precompile for Sha256Precompile {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_used = linear_cost(input.len(), SHA256_BASE_COST, SHA256_WORD_COST);
        if gas_used > gas_limit {
            return Err(PrecompileError::OutOfGas);
        }
        Ok(PrecompileOutput {
            gas_used,
            output: Bytes::from_slice(&Sha256::digest(input)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        let result = Sha256Precompile.execute(&[], 100_000).unwrap();

        // SHA256 of empty string
        let expected = [
            0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14,
            0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
            0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c,
            0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
        ];
        assert_eq!(result.output.as_slice(), &expected);
        assert_eq!(result.gas_used, 60);
    }

    #[test]
    fn test_sha256_cost_per_word() {
        let result = Sha256Precompile.execute(&[1u8; 64], 100_000).unwrap();
        assert_eq!(result.gas_used, 60 + 24);
    }

    #[test]
    fn test_sha256_out_of_gas() {
        assert_eq!(Sha256Precompile.execute(&[0u8; 100], 1), Err(PrecompileError::OutOfGas));
    }
}
