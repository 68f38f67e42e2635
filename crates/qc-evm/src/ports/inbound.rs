//! # Driving Ports (API - Inbound)
//!
//! The surface an embedder (block executor, test harness, RPC layer) drives
//! the engine through. [`Evm`] is the only implementation in this crate.

use crate::domain::entities::{ExecutionResult, Message, Transaction};
use crate::errors::VmError;
use crate::evm::executor::Evm;
use crate::ports::outbound::Tracer;

/// Primary API for executing EVM code.
///
/// All methods return `Err` only for fatal host faults (`State`,
/// `Internal`). Contract failures come back as an [`ExecutionResult`]
/// with a revert or halt status.
pub trait ExecutionApi {
    /// Runs a full transaction: intrinsic gas, nonce, root call or create,
    /// refunds, state flush.
    ///
    /// # Errors
    ///
    /// Fatal host errors only.
    fn transact(&mut self, tx: &Transaction) -> Result<ExecutionResult, VmError>;

    /// Runs one message inside the current transaction.
    ///
    /// # Errors
    ///
    /// Fatal host errors only.
    fn execute(&mut self, message: &Message) -> Result<ExecutionResult, VmError>;

    /// Runs a read-only message (eth_call style).
    ///
    /// # Errors
    ///
    /// Fatal host errors, or `Internal` if the message wrote state.
    fn static_call(&mut self, message: &Message) -> Result<ExecutionResult, VmError>;
}

impl<T: Tracer> ExecutionApi for Evm<T> {
    fn transact(&mut self, tx: &Transaction) -> Result<ExecutionResult, VmError> {
        Evm::transact(self, tx)
    }

    fn execute(&mut self, message: &Message) -> Result<ExecutionResult, VmError> {
        Evm::execute(self, message)
    }

    fn static_call(&mut self, message: &Message) -> Result<ExecutionResult, VmError> {
        Evm::static_call(self, message)
    }
}
