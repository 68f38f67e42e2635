//! # Identity Precompile (0x04)
//!
//! Returns the input unchanged.

use super::{linear_cost, Precompile};
use crate::domain::value_objects::Bytes;
use crate::errors::PrecompileError;
use crate::ports::outbound::PrecompileOutput;

/// Base gas cost.
const IDENTITY_BASE_COST: u64 = 15;
/// Gas cost per word.
const IDENTITY_WORD_COST: u64 = 3;

/// Identity precompile.
pub struct Identity;

impl Precompile for Identity {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_used = linear_cost(input.len(), IDENTITY_BASE_COST, IDENTITY_WORD_COST);
        if gas_used > gas_limit {
            return Err(PrecompileError::OutOfGas);
        }
        Ok(PrecompileOutput {
            gas_used,
            output: Bytes::from_slice(input),
        })
    }
}
