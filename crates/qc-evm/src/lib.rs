//! # QC-EVM - Ethereum Virtual Machine Execution Core
//!
//! A hardfork-aware EVM interpreter: 256-bit stack machine, byte-addressed
//! memory with quadratic expansion cost, journaled world state with
//! transient storage, EIP-2929 warm/cold access tracking, gas metering and
//! refunds across Frontier..Osaka, nested CALL/CREATE frames with
//! checkpoint rollback, precompile dispatch and per-opcode tracing.
//!
//! ## Architecture
//!
//! | Layer | Location | Contents |
//! |-------|----------|----------|
//! | Domain | `domain/` | Accounts, environments, results, hardforks, invariants |
//! | Ports | `ports/` | `ExecutionApi` (inbound); `StateBackend`, `PrecompileProvider`, `Tracer` (outbound) |
//! | EVM | `evm/` | Stack, memory, gas, opcodes, state, frames, executor |
//! | Adapters | `adapters/` | `InMemoryBackend`, `NoopTracer`, `TraceCollector` |
//!
//! ## Execution Limits
//!
//! | Limit | Value |
//! |-------|-------|
//! | Stack depth | 1024 items |
//! | Call depth | 1024 frames |
//! | Code size | 24 KB (EIP-170, Spurious Dragon+) |
//! | Init code size | 48 KB (EIP-3860, Shanghai+) |
//! | Memory offset | 2^32 - 1 (gas bounds the rest) |
//!
//! ## Error Model
//!
//! Contract-level failures (out of gas, invalid jump, static violation, ...)
//! end the failing frame only and come back as a failed result. Only
//! [`VmError::State`](errors::VmError::State) and
//! [`VmError::Internal`](errors::VmError::Internal) reach the embedder as
//! `Err`.
//!
//! ## Usage Example
//!
//! ```
//! use qc_evm::prelude::*;
//!
//! let caller = Address::from_low_u64(0xCA11);
//! let contract = Address::from_low_u64(0xC0DE);
//!
//! let mut evm = Evm::new(EvmConfig::for_hardfork(Hardfork::Cancun));
//! evm.state_mut()
//!     .insert_account(caller, Account::new_eoa(U256::from(10u128.pow(18)), 0));
//! // PUSH1 3, PUSH1 4, ADD, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
//! let code = [0x60, 0x03, 0x60, 0x04, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3];
//! evm.state_mut()
//!     .insert_account(contract, Account::new_contract(U256::zero(), Bytes::from_slice(&code)));
//!
//! let tx = Transaction {
//!     caller,
//!     to: Some(contract),
//!     gas_limit: 100_000,
//!     ..Transaction::default()
//! };
//! let result = evm.transact(&tx).unwrap();
//! assert!(result.is_success());
//! assert_eq!(U256::from_big_endian(result.output.as_slice()), U256::from(7));
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod evm;
pub mod ports;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        Account, AccessListItem, BlockContext, CallKind, CallResult, ExecutionResult,
        ExecutionStatus, Log, Message, Transaction, TxEnv,
    };
    pub use crate::domain::hardfork::Hardfork;

    // Value objects
    pub use crate::domain::value_objects::{Address, Bytes, Hash, U256};

    // Domain services
    pub use crate::domain::services::{
        compute_contract_address, compute_contract_address_create2, keccak256, precompiles,
    };

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, limits, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::ExecutionApi;
    pub use crate::ports::outbound::{
        CallTrace, PrecompileOutput, PrecompileProvider, StateBackend, StepTrace, Tracer,
    };

    // Errors
    pub use crate::errors::{ConfigError, PrecompileError, StateError, VmError};

    // Configuration
    pub use crate::config::EvmConfig;

    // EVM components
    pub use crate::evm::{gas, Evm, GasSchedule, StandardPrecompiles, WorldState};

    // Adapters
    pub use crate::adapters::{InMemoryBackend, NoopTracer, TraceCollector};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
