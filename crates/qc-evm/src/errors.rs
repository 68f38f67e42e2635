//! # Error Types
//!
//! All error types for EVM execution.
//!
//! Every [`VmError`] raised inside a frame is caught at the enclosing call
//! boundary and turned into a failed [`CallResult`](crate::domain::CallResult).
//! Only [`VmError::is_fatal`] errors escape to the embedder.

use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors that can occur during EVM execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// Stack overflow (>1024 items).
    #[error("stack overflow")]
    StackOverflow,

    /// Stack underflow (pop or reference beyond the current size).
    #[error("stack underflow")]
    StackUnderflow,

    /// Opcode undefined or not yet enabled at the active hardfork.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Jump target is not a `JUMPDEST` outside PUSH data.
    #[error("invalid jump destination: {0}")]
    InvalidJump(U256),

    /// RETURNDATACOPY read past the end of the return-data buffer.
    #[error("return data out of bounds: offset {offset}, size {size}, available {available}")]
    ReturnDataOutOfBounds {
        /// Requested source offset.
        offset: U256,
        /// Requested length.
        size: U256,
        /// Bytes held by the buffer.
        available: usize,
    },

    /// State-modifying operation inside a static frame.
    #[error("state modification in static context")]
    StaticCallViolation,

    /// Nested call or create would exceed the call depth limit.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded {
        /// Depth the new frame would have.
        depth: usize,
        /// Maximum allowed depth.
        max: usize,
    },

    /// Insufficient balance for a value transfer.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Value to transfer.
        required: U256,
        /// Sender balance.
        available: U256,
    },

    /// CREATE target already has a nonce or code.
    #[error("contract already exists at address: {0:?}")]
    ContractAlreadyExists(Address),

    /// Deployed code exceeds the EIP-170 limit.
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeSizeExceeded {
        /// Returned code size.
        size: usize,
        /// Active limit.
        max: usize,
    },

    /// Init code exceeds the EIP-3860 limit.
    #[error("init code size exceeded: {size} > {max} bytes")]
    InitCodeSizeExceeded {
        /// Init code size.
        size: usize,
        /// Active limit.
        max: usize,
    },

    /// Deployed code starts with 0xEF (EIP-3541).
    #[error("code starts with 0xEF byte (reserved for EOF)")]
    InvalidCodePrefix,

    /// Creator nonce cannot be incremented.
    #[error("nonce overflow for {0:?}")]
    NonceOverflow(Address),

    /// Precompiled contract failed.
    #[error("precompile failed: {0}")]
    Precompile(#[from] PrecompileError),

    /// State backend failure. Fatal.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Host-level invariant violation. Fatal.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VmError {
    /// Returns true if this error must abort the whole transaction instead of
    /// failing only the current frame.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::State(_) | Self::Internal(_))
    }

    /// Returns true if a frame halting with this error forfeits all of its gas.
    ///
    /// Depth, balance and nonce checks fail a call before its frame starts, so
    /// the forwarded gas goes back to the caller.
    #[must_use]
    pub fn consumes_all_gas(&self) -> bool {
        !matches!(
            self,
            Self::CallDepthExceeded { .. } | Self::InsufficientBalance { .. } | Self::NonceOverflow(_)
        )
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from the state backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Backend could not be reached.
    #[error("state backend unavailable: {0}")]
    Unavailable(String),

    /// Backend returned inconsistent data.
    #[error("state corruption detected: {0}")]
    Corrupted(String),

    /// Backend refuses writes.
    #[error("state backend is read-only")]
    ReadOnly,

    /// Other backend error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors from precompiled contract execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Invalid input length.
    #[error("invalid input length: expected {expected}, got {actual}")]
    InvalidInputLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Out of gas during precompile execution.
    #[error("precompile out of gas")]
    OutOfGas,

    /// Address is a precompile at this fork but no implementation is installed.
    #[error("precompile not implemented: {0:?}")]
    NotImplemented(Address),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors raised while building an [`EvmConfig`](crate::config::EvmConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Hardfork name not recognised.
    #[error("unknown hardfork: {0}")]
    UnknownHardfork(String),

    /// Configuration document could not be decoded.
    #[error("invalid configuration: {0}")]
    Decode(#[from] serde_json::Error),
}

// =============================================================================
// TESTS
// =============================================================================
