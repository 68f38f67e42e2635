//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the interpreter depends on. Embedders implement these to plug
//! in external state, precompiled contracts and execution tracing.
//!
//! All ports are synchronous: execution of one transaction is a single,
//! depth-bounded chain of frames and never yields.

use crate::domain::entities::{Account, CallKind, CallResult};
use crate::domain::hardfork::Hardfork;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::{PrecompileError, StateError};
use serde::Serialize;
use std::fmt;

// =============================================================================
// STATE BACKEND
// =============================================================================

/// Persistent state the in-process world state lazily loads from and
/// flushes to at transaction end.
///
/// Reads of unknown accounts return `None`; reads of unknown slots return
/// zero.
pub trait StateBackend: fmt::Debug {
    /// Get account state, `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backing store cannot be read.
    fn account(&self, address: &Address) -> Result<Option<Account>, StateError>;

    /// Get a storage value.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backing store cannot be read.
    fn storage(&self, address: &Address, key: U256) -> Result<U256, StateError>;

    /// Hash of block `number`, if known.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backing store cannot be read.
    fn block_hash(&self, _number: u64) -> Result<Option<Hash>, StateError> {
        Ok(None)
    }

    /// Create or replace an account.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the write is rejected.
    fn set_account(&mut self, address: Address, account: Account) -> Result<(), StateError>;

    /// Write a storage slot.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the write is rejected.
    fn set_storage(&mut self, address: Address, key: U256, value: U256) -> Result<(), StateError>;

    /// Remove an account together with its storage.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the write is rejected.
    fn delete_account(&mut self, address: &Address) -> Result<(), StateError>;

    /// Get account balance.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StateBackend::account`].
    fn balance(&self, address: &Address) -> Result<U256, StateError> {
        Ok(self.account(address)?.map(|a| a.balance).unwrap_or_default())
    }

    /// Get account nonce.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StateBackend::account`].
    fn nonce(&self, address: &Address) -> Result<u64, StateError> {
        Ok(self.account(address)?.map_or(0, |a| a.nonce))
    }

    /// Get contract code (empty for EOAs).
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StateBackend::account`].
    fn code(&self, address: &Address) -> Result<Bytes, StateError> {
        Ok(self.account(address)?.map(|a| a.code).unwrap_or_default())
    }

    /// Set account balance, creating the account if needed.
    ///
    /// # Errors
    ///
    /// Propagates backend read and write errors.
    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), StateError> {
        let mut account = self.account(&address)?.unwrap_or_default();
        account.balance = balance;
        self.set_account(address, account)
    }

    /// Set account nonce, creating the account if needed.
    ///
    /// # Errors
    ///
    /// Propagates backend read and write errors.
    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError> {
        let mut account = self.account(&address)?.unwrap_or_default();
        account.nonce = nonce;
        self.set_account(address, account)
    }

    /// Set account code, creating the account if needed.
    ///
    /// # Errors
    ///
    /// Propagates backend read and write errors.
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        let mut account = self.account(&address)?.unwrap_or_default();
        account.code_hash = crate::domain::services::code_hash(code.as_slice());
        account.code = code;
        self.set_account(address, account)
    }
}

// =============================================================================
// PRECOMPILES
// =============================================================================

/// Precompile execution result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas used by the precompile.
    pub gas_used: u64,
    /// Output data.
    pub output: Bytes,
}

/// Dispatch for precompiled contracts.
///
/// The interpreter asks [`PrecompileProvider::is_precompile`] before
/// treating a call target as ordinary code. Precompiles always count as
/// existing accounts for new-account gas.
pub trait PrecompileProvider: fmt::Debug {
    /// Returns true if `address` is a precompile at `fork`.
    fn is_precompile(&self, address: &Address, fork: Hardfork) -> bool;

    /// Runs the precompile at `address`.
    ///
    /// # Errors
    ///
    /// Returns a `PrecompileError` on malformed input, insufficient gas or a
    /// missing implementation. The caller forfeits `gas_limit`.
    fn run(
        &self,
        address: &Address,
        input: &[u8],
        gas_limit: u64,
        fork: Hardfork,
    ) -> Result<PrecompileOutput, PrecompileError>;
}

// =============================================================================
// TRACER
// =============================================================================

/// Memory written by one opcode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemoryDelta {
    /// First byte written.
    pub offset: usize,
    /// Bytes now at `offset`.
    pub data: Bytes,
}

/// One storage slot changed by one opcode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StorageDelta {
    /// Contract whose storage changed.
    pub address: Address,
    /// Slot key.
    pub key: U256,
    /// Value before the opcode.
    pub previous: U256,
    /// Value after the opcode.
    pub value: U256,
    /// EIP-1153 transient slot.
    pub transient: bool,
}

/// Snapshot of one executed opcode.
///
/// Records are emitted once the opcode has finished, so `gas_cost` and the
/// deltas are final. For CALL and CREATE opcodes this places the record
/// after every event of the frame they entered, unlike EIP-3155 traces,
/// which print the pre-execution line first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepTrace {
    /// Frame depth (root = 0).
    pub depth: usize,
    /// Program counter of the opcode.
    pub pc: usize,
    /// Raw opcode byte.
    pub opcode: u8,
    /// Gas before the opcode.
    pub gas_remaining: u64,
    /// Gas consumed by the opcode, nested frames included.
    pub gas_cost: u64,
    /// Stack before the opcode, bottom first.
    pub stack: Vec<U256>,
    /// Memory written by the opcode.
    pub memory_delta: Option<MemoryDelta>,
    /// Storage written by the opcode. Empty for CALL/CREATE opcodes, whose
    /// nested writes are reported by the nested frames' own steps.
    pub storage_deltas: Vec<StorageDelta>,
    /// Halt reason, if the opcode failed.
    pub error: Option<String>,
}

/// Frame entry as reported to tracers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallTrace {
    /// Depth of the new frame.
    pub depth: usize,
    /// Call or create variant.
    pub kind: CallKind,
    /// CALLER inside the frame.
    pub caller: Address,
    /// ADDRESS inside the frame (the new contract for creations).
    pub address: Address,
    /// CALLVALUE inside the frame.
    pub value: U256,
    /// Gas handed to the frame.
    pub gas_limit: u64,
    /// Read-only frame.
    pub is_static: bool,
}

/// Pure observer of execution. Never affects gas or state.
pub trait Tracer {
    /// Returns false to let frames skip building step snapshots.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Called after every opcode completes, with the pre-opcode pc, gas
    /// and stack. A CALL or CREATE step arrives after the `call_end` of
    /// the frame it entered.
    fn step(&mut self, _step: &StepTrace) {}

    /// Called when a nested or root frame is entered.
    fn call_start(&mut self, _call: &CallTrace) {}

    /// Called when the frame entered at `depth` returns.
    fn call_end(&mut self, _depth: usize, _result: &CallResult) {}
}
