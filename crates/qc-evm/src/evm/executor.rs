//! # Executor
//!
//! [`Evm`] owns everything the frames of one transaction share: world state,
//! warm/cold sets, the log list, the self-destruct list, the precompile
//! provider and the tracer. Frames borrow it mutably while they run, and
//! nested calls recurse through [`Evm::call`] / [`Evm::create`] with an
//! explicit depth counter.
//!
//! ## Failure boundary
//!
//! Every nested call runs under a checkpoint. A failed child is rolled back
//! and reported to its parent as an unsuccessful [`CallResult`]; only fatal
//! host errors ([`VmError::is_fatal`]) unwind out of [`Evm::transact`].

use crate::adapters::tracer::NoopTracer;
use crate::config::EvmConfig;
use crate::domain::entities::{
    decode_revert_reason, BlockContext, CallInput, CallKind, CallResult, CreateInput,
    CreateScheme, ExecutionResult, ExecutionStatus, Log, Message, Transaction, TxEnv,
};
use crate::domain::hardfork::Hardfork;
use crate::domain::invariants::{self, limits, InvariantCheckResult, InvariantViolation};
use crate::domain::services::{
    compute_contract_address, compute_contract_address_create2, precompiles,
};
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::VmError;
use crate::evm::access::AccessTracker;
use crate::evm::frame::Frame;
use crate::evm::gas::{self, costs, GasSchedule};
use crate::evm::opcodes::OpcodeTable;
use crate::evm::precompiles::StandardPrecompiles;
use crate::evm::state::WorldState;
use crate::ports::outbound::{CallTrace, PrecompileProvider, StateBackend, Tracer};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Rollback point for a nested call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Checkpoint {
    journal: usize,
    logs: usize,
    selfdestructs: usize,
}

/// The EVM execution engine.
pub struct Evm<T: Tracer = NoopTracer> {
    pub(crate) config: EvmConfig,
    pub(crate) schedule: GasSchedule,
    pub(crate) table: OpcodeTable,
    pub(crate) state: WorldState,
    pub(crate) access: AccessTracker,
    pub(crate) block: BlockContext,
    pub(crate) tx: TxEnv,
    pub(crate) logs: Vec<Log>,
    pub(crate) precompiles: Box<dyn PrecompileProvider>,
    pub(crate) tracer: T,
    selfdestructs: Vec<Address>,
    depth: usize,
}

impl Evm<NoopTracer> {
    /// Engine with empty in-process state and the standard precompiles.
    #[must_use]
    pub fn new(config: EvmConfig) -> Self {
        let schedule = config.schedule();
        Self {
            table: OpcodeTable::new(config.hardfork, &schedule),
            access: AccessTracker::new(&schedule),
            schedule,
            config,
            state: WorldState::new(),
            block: BlockContext::default(),
            tx: TxEnv::default(),
            logs: Vec::new(),
            precompiles: Box::new(StandardPrecompiles::new()),
            tracer: NoopTracer,
            selfdestructs: Vec::new(),
            depth: 0,
        }
    }
}

impl Default for Evm<NoopTracer> {
    fn default() -> Self {
        Self::new(EvmConfig::default())
    }
}

impl<T: Tracer> fmt::Debug for Evm<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evm")
            .field("hardfork", &self.config.hardfork)
            .field("depth", &self.depth)
            .field("logs", &self.logs.len())
            .field("precompiles", &self.precompiles)
            .finish_non_exhaustive()
    }
}

impl<T: Tracer> Evm<T> {
    // -------------------------------------------------------------------------
    // Builders & accessors
    // -------------------------------------------------------------------------

    /// Replaces the tracer.
    #[must_use]
    pub fn with_tracer<U: Tracer>(self, tracer: U) -> Evm<U> {
        Evm {
            config: self.config,
            schedule: self.schedule,
            table: self.table,
            state: self.state,
            access: self.access,
            block: self.block,
            tx: self.tx,
            logs: self.logs,
            precompiles: self.precompiles,
            tracer,
            selfdestructs: self.selfdestructs,
            depth: self.depth,
        }
    }

    /// Replaces the precompile provider.
    #[must_use]
    pub fn with_precompiles(mut self, provider: impl PrecompileProvider + 'static) -> Self {
        self.precompiles = Box::new(provider);
        self
    }

    /// Replaces the world state with one backed by `backend`.
    #[must_use]
    pub fn with_backend(mut self, backend: impl StateBackend + 'static) -> Self {
        self.state = WorldState::with_backend(Box::new(backend));
        self
    }

    /// Sets the block environment.
    #[must_use]
    pub fn with_block(mut self, block: BlockContext) -> Self {
        self.block = block;
        self
    }

    /// Sets the block environment in place.
    pub fn set_block(&mut self, block: BlockContext) {
        self.block = block;
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    /// Active fork.
    #[must_use]
    pub fn hardfork(&self) -> Hardfork {
        self.config.hardfork
    }

    /// Prices in force.
    #[must_use]
    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }

    /// Block environment.
    #[must_use]
    pub fn block(&self) -> &BlockContext {
        &self.block
    }

    /// World state.
    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Mutable world state, for fixtures and inspection.
    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    /// Warm/cold sets of the current transaction.
    #[must_use]
    pub fn access(&self) -> &AccessTracker {
        &self.access
    }

    /// Logs emitted so far in the current transaction.
    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Frames currently running.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The tracer.
    #[must_use]
    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    /// Consumes the engine, returning the tracer.
    pub fn into_tracer(self) -> T {
        self.tracer
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Runs a transaction end to end: intrinsic gas, nonce, pre-warming, the
    /// root call or creation, refund cap, self-destructs and state flush.
    ///
    /// Fee settlement is left to the embedder.
    ///
    /// # Errors
    ///
    /// Returns only fatal host errors; contract failures are reported in the
    /// [`ExecutionResult`].
    #[instrument(skip(self, tx), fields(caller = ?tx.caller, to = ?tx.to, gas_limit = tx.gas_limit))]
    pub fn transact(&mut self, tx: &Transaction) -> Result<ExecutionResult, VmError> {
        let fork = self.config.hardfork;
        self.begin_transaction(TxEnv {
            origin: tx.caller,
            gas_price: tx.gas_price,
            blob_hashes: tx.blob_hashes.clone(),
        });

        let intrinsic = gas::intrinsic_gas(
            &self.schedule,
            tx.data.as_slice(),
            tx.is_create(),
            &tx.access_list,
        );
        if intrinsic > tx.gas_limit {
            return Ok(rejected(tx.gas_limit, VmError::OutOfGas));
        }
        if tx.is_create()
            && fork.is_enabled_in(Hardfork::Shanghai)
            && tx.data.len() > self.config.max_init_code_size
        {
            let error = VmError::InitCodeSizeExceeded {
                size: tx.data.len(),
                max: self.config.max_init_code_size,
            };
            return Ok(rejected(tx.gas_limit, error));
        }
        self.warm_transaction(tx);

        let gas_limit = tx.gas_limit - intrinsic;
        let outcome = match tx.to {
            Some(to) => self.call_transaction(tx, to, gas_limit),
            None => self.create(CreateInput {
                scheme: CreateScheme::Create,
                caller: tx.caller,
                value: tx.value,
                init_code: tx.data.clone(),
                gas_limit,
            }),
        };
        let call = match outcome {
            Ok(call) => call,
            Err(error) => return Err(self.abort(error)),
        };

        let result = self.build_result(call, tx.gas_limit, 0);
        if let Err(error) = self.finish_transaction() {
            return Err(self.abort(error));
        }

        if let InvariantCheckResult::Invalid(violations) =
            invariants::check_all_invariants(&result, tx.gas_limit, &self.schedule)
        {
            return Err(self.abort(violation_error(&violations)));
        }

        info!(
            status = ?result.status,
            gas_used = result.gas_used,
            gas_refunded = result.gas_refunded,
            logs = result.logs.len(),
            "transaction executed"
        );
        Ok(result)
    }

    /// Runs one top-level message inside the current transaction: no
    /// intrinsic gas, no sender nonce bump, no flush. Bracket a sequence of
    /// messages with [`Evm::begin_transaction`] and
    /// [`Evm::finish_transaction`].
    ///
    /// # Errors
    ///
    /// Returns only fatal host errors.
    #[instrument(skip(self, message), fields(caller = ?message.caller, to = ?message.to, gas_limit = message.gas_limit))]
    pub fn execute(&mut self, message: &Message) -> Result<ExecutionResult, VmError> {
        let logs_from = self.logs.len();
        self.warm_environment();
        self.access.warm_address(message.caller);

        let outcome = match message.to {
            Some(to) => {
                self.access.warm_address(to);
                self.call(CallInput {
                    kind: if message.is_static { CallKind::StaticCall } else { CallKind::Call },
                    caller: message.caller,
                    address: to,
                    code_address: to,
                    value: if message.is_static { U256::zero() } else { message.value },
                    transfers_value: !message.is_static,
                    input: message.data.clone(),
                    gas_limit: message.gas_limit,
                    is_static: message.is_static,
                })
            }
            None if message.is_static => Ok(CallResult::halt(
                VmError::StaticCallViolation,
                message.gas_limit,
            )),
            None => self.create(CreateInput {
                scheme: CreateScheme::Create,
                caller: message.caller,
                value: message.value,
                init_code: message.data.clone(),
                gas_limit: message.gas_limit,
            }),
        };

        match outcome {
            Ok(call) => Ok(self.build_result(call, message.gas_limit, logs_from)),
            Err(error) => Err(self.abort(error)),
        }
    }

    /// Runs `message` read-only and verifies nothing was written.
    ///
    /// # Errors
    ///
    /// Returns fatal host errors, or `Internal` if the journal shows a write.
    pub fn static_call(&mut self, message: &Message) -> Result<ExecutionResult, VmError> {
        let checkpoint = self.state.checkpoint();
        let message = Message {
            is_static: true,
            ..message.clone()
        };
        let result = self.execute(&message)?;

        let journal = self.state.journal_since(checkpoint);
        if !invariants::check_static_purity(journal) {
            let writes = journal.len();
            return Err(self.abort(violation_error(&[InvariantViolation::StaticCallViolation {
                writes,
            }])));
        }
        Ok(result)
    }

    /// Starts a transaction: clears the journal, original slot values,
    /// transient storage, warm sets and logs, and installs `env`.
    pub fn begin_transaction(&mut self, env: TxEnv) {
        self.state.reset_transaction();
        self.access.clear();
        self.logs.clear();
        self.selfdestructs.clear();
        self.tx = env;
    }

    /// Ends a transaction: deletes self-destructed accounts, drops
    /// per-transaction bookkeeping and flushes to the backend.
    ///
    /// # Errors
    ///
    /// Returns `State` if the backend rejects the flush.
    pub fn finish_transaction(&mut self) -> Result<(), VmError> {
        for address in std::mem::take(&mut self.selfdestructs) {
            self.state.destroy_account(address);
        }
        self.state.reset_transaction();
        self.access.clear();
        self.state.flush()?;
        Ok(())
    }

    fn warm_transaction(&mut self, tx: &Transaction) {
        self.warm_environment();
        self.access.warm_address(tx.caller);
        if let Some(to) = tx.to {
            self.access.warm_address(to);
        }
        for item in &tx.access_list {
            self.access.warm_address(item.address);
            for key in &item.storage_keys {
                self.access.warm_slot(item.address, *key);
            }
        }
    }

    /// Precompiles (Berlin+) and the coinbase (Shanghai+) start warm in
    /// every transaction.
    fn warm_environment(&mut self) {
        let fork = self.config.hardfork;
        if fork.has_access_lists() {
            for address in precompiles::active(fork) {
                self.access.warm_address(address);
            }
        }
        if fork.is_enabled_in(Hardfork::Shanghai) {
            self.access.warm_address(self.block.coinbase);
        }
    }

    fn call_transaction(
        &mut self,
        tx: &Transaction,
        to: Address,
        gas_limit: u64,
    ) -> Result<CallResult, VmError> {
        match self.state.increment_nonce(tx.caller) {
            Ok(_) => {}
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => return Ok(CallResult::halt(error, gas_limit)),
        }
        self.call(CallInput {
            kind: CallKind::Call,
            caller: tx.caller,
            address: to,
            code_address: to,
            value: tx.value,
            transfers_value: true,
            input: tx.data.clone(),
            gas_limit,
            is_static: false,
        })
    }

    fn build_result(&self, call: CallResult, gas_limit: u64, logs_from: usize) -> ExecutionResult {
        let used = gas_limit.saturating_sub(call.gas_left);
        let (status, refunded, logs) = if call.success {
            let refunded = gas::capped_refund(&self.schedule, used, call.gas_refund);
            let logs = self.logs.get(logs_from..).unwrap_or_default().to_vec();
            (ExecutionStatus::Success, refunded, logs)
        } else if call.is_revert() {
            (ExecutionStatus::Revert, 0, Vec::new())
        } else {
            (ExecutionStatus::Halt, 0, Vec::new())
        };
        let revert_reason = if status == ExecutionStatus::Revert {
            decode_revert_reason(call.output.as_slice())
        } else {
            None
        };

        ExecutionResult {
            status,
            gas_used: used - refunded,
            gas_refunded: refunded,
            output: call.output,
            logs,
            created_address: call.created_address,
            revert_reason,
            error: call.error,
        }
    }

    /// Rolls the whole transaction back after a fatal error.
    fn abort(&mut self, error: VmError) -> VmError {
        warn!(error = %error, depth = self.depth, "fatal error, transaction aborted");
        self.state.revert_to(0);
        self.logs.clear();
        self.selfdestructs.clear();
        self.depth = 0;
        error
    }

    // -------------------------------------------------------------------------
    // Nested execution
    // -------------------------------------------------------------------------

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal: self.state.checkpoint(),
            logs: self.logs.len(),
            selfdestructs: self.selfdestructs.len(),
        }
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        self.state.revert_to(checkpoint.journal);
        self.logs.truncate(checkpoint.logs);
        self.selfdestructs.truncate(checkpoint.selfdestructs);
    }

    fn run_frame(&mut self, frame: &mut Frame) -> Result<CallResult, VmError> {
        if !invariants::check_call_depth(frame.depth()) {
            return Err(violation_error(&[InvariantViolation::CallDepthExceeded {
                depth: frame.depth(),
                max: limits::MAX_CALL_DEPTH,
            }]));
        }
        self.depth += 1;
        let result = frame.run(self);
        self.depth -= 1;
        result
    }

    /// Executes a CALL-family request whose caller-side gas has already
    /// been charged.
    ///
    /// # Errors
    ///
    /// Returns only fatal host errors.
    pub fn call(&mut self, input: CallInput) -> Result<CallResult, VmError> {
        let fork = self.config.hardfork;
        let depth = self.depth;
        if depth > limits::MAX_CALL_DEPTH {
            let error = VmError::CallDepthExceeded {
                depth,
                max: limits::MAX_CALL_DEPTH,
            };
            return Ok(CallResult::halt(error, input.gas_limit));
        }

        let checkpoint = self.checkpoint();
        let is_precompile = self.precompiles.is_precompile(&input.code_address, fork);
        if input.transfers_value {
            // EIP-161: a zero-value CALL does not bring an account into existence.
            let skip_touch = input.kind == CallKind::Call
                && input.value.is_zero()
                && fork.has_empty_account_semantics()
                && !is_precompile
                && !self.state.exists(&input.address)?;
            if !skip_touch {
                if let Err(error) = self.state.transfer(input.caller, input.address, input.value) {
                    if error.is_fatal() {
                        return Err(error);
                    }
                    return Ok(CallResult::halt(error, input.gas_limit));
                }
            }
        }

        debug!(kind = ?input.kind, depth, target = ?input.address, gas = input.gas_limit, "call enter");
        self.tracer.call_start(&CallTrace {
            depth,
            kind: input.kind,
            caller: input.caller,
            address: input.address,
            value: input.value,
            gas_limit: input.gas_limit,
            is_static: input.is_static,
        });

        let result = if is_precompile {
            self.run_precompile(&input)
        } else {
            let code = self.state.code(&input.code_address)?;
            if code.is_empty() {
                CallResult::success(input.gas_limit, 0, Bytes::new())
            } else {
                let mut frame = Frame::for_call(input, code, depth);
                self.run_frame(&mut frame)?
            }
        };

        if !result.success {
            self.revert_to(checkpoint);
        }
        self.tracer.call_end(depth, &result);
        debug!(depth, success = result.success, gas_left = result.gas_left, "call exit");
        Ok(result)
    }

    fn run_precompile(&self, input: &CallInput) -> CallResult {
        let fork = self.config.hardfork;
        match self
            .precompiles
            .run(&input.code_address, input.input.as_slice(), input.gas_limit, fork)
        {
            Ok(output) => CallResult::success(
                input.gas_limit.saturating_sub(output.gas_used),
                0,
                output.output,
            ),
            Err(error) => CallResult::halt(VmError::Precompile(error), input.gas_limit),
        }
    }

    /// Executes a CREATE/CREATE2 request whose caller-side gas has already
    /// been charged.
    ///
    /// # Errors
    ///
    /// Returns only fatal host errors.
    pub fn create(&mut self, input: CreateInput) -> Result<CallResult, VmError> {
        let fork = self.config.hardfork;
        let depth = self.depth;
        if depth > limits::MAX_CALL_DEPTH {
            let error = VmError::CallDepthExceeded {
                depth,
                max: limits::MAX_CALL_DEPTH,
            };
            return Ok(CallResult::halt(error, input.gas_limit));
        }

        let available = self.state.balance(&input.caller)?;
        if available < input.value {
            let error = VmError::InsufficientBalance {
                required: input.value,
                available,
            };
            return Ok(CallResult::halt(error, input.gas_limit));
        }
        let nonce = match self.state.increment_nonce(input.caller) {
            Ok(nonce) => nonce,
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => return Ok(CallResult::halt(error, input.gas_limit)),
        };

        let address = match input.scheme {
            CreateScheme::Create => compute_contract_address(input.caller, nonce),
            CreateScheme::Create2 { salt } => compute_contract_address_create2(
                input.caller,
                Hash::from_word(salt),
                input.init_code.as_slice(),
            ),
        };
        self.access.warm_address(address);
        if self.state.nonce(&address)? != 0 || !self.state.code(&address)?.is_empty() {
            return Ok(CallResult::halt(
                VmError::ContractAlreadyExists(address),
                input.gas_limit,
            ));
        }

        let checkpoint = self.checkpoint();
        if fork.has_empty_account_semantics() {
            self.state.set_nonce(address, 1)?;
        } else {
            self.state.touch(address)?;
        }
        self.state.mark_created(address);
        if let Err(error) = self.state.transfer(input.caller, address, input.value) {
            self.revert_to(checkpoint);
            if error.is_fatal() {
                return Err(error);
            }
            return Ok(CallResult::halt(error, input.gas_limit));
        }

        let kind = match input.scheme {
            CreateScheme::Create => CallKind::Create,
            CreateScheme::Create2 { .. } => CallKind::Create2,
        };
        debug!(?kind, depth, ?address, gas = input.gas_limit, "create enter");
        self.tracer.call_start(&CallTrace {
            depth,
            kind,
            caller: input.caller,
            address,
            value: input.value,
            gas_limit: input.gas_limit,
            is_static: false,
        });

        let mut frame = Frame::for_create(&input, address, depth);
        let mut result = self.run_frame(&mut frame)?;
        if result.success {
            result = self.deposit_code(address, result)?;
        }
        if result.success {
            result.created_address = Some(address);
        } else {
            self.revert_to(checkpoint);
        }

        self.tracer.call_end(depth, &result);
        debug!(depth, success = result.success, gas_left = result.gas_left, "create exit");
        Ok(result)
    }

    /// Validates and stores the code returned by init code.
    fn deposit_code(&mut self, address: Address, result: CallResult) -> Result<CallResult, VmError> {
        let fork = self.config.hardfork;
        let code = result.output;

        if fork.has_reduced_refunds() && code.as_slice().first() == Some(&0xEF) {
            return Ok(CallResult::halt(VmError::InvalidCodePrefix, result.gas_left));
        }
        if fork.has_empty_account_semantics() && code.len() > self.config.max_code_size {
            let error = VmError::CodeSizeExceeded {
                size: code.len(),
                max: self.config.max_code_size,
            };
            return Ok(CallResult::halt(error, result.gas_left));
        }

        let cost = costs::CODE_DEPOSIT * code.len() as u64;
        if cost > result.gas_left {
            if fork.is_enabled_in(Hardfork::Homestead) {
                return Ok(CallResult::halt(VmError::OutOfGas, result.gas_left));
            }
            // Frontier keeps the account, without code.
            return Ok(CallResult::success(result.gas_left, result.gas_refund, Bytes::new()));
        }

        self.state.set_code(address, code.clone())?;
        Ok(CallResult::success(
            result.gas_left - cost,
            result.gas_refund,
            code,
        ))
    }

    /// Moves the balance of `address` to `beneficiary` and schedules the
    /// account for deletion where the fork allows it.
    ///
    /// Returns true if this is the first scheduled deletion of `address` in
    /// the transaction.
    pub(crate) fn self_destruct(
        &mut self,
        address: Address,
        beneficiary: Address,
    ) -> Result<bool, VmError> {
        let deletes = !self.config.hardfork.has_restricted_selfdestruct()
            || self.state.is_created(&address);
        let balance = self.state.balance(&address)?;

        if beneficiary != address {
            self.state.transfer(address, beneficiary, balance)?;
        }
        if !deletes {
            return Ok(false);
        }
        self.state.set_balance(address, U256::zero())?;
        if self.selfdestructs.contains(&address) {
            return Ok(false);
        }
        self.selfdestructs.push(address);
        Ok(true)
    }
}

/// Result for a transaction that fails validation before any code runs.
fn rejected(gas_limit: u64, error: VmError) -> ExecutionResult {
    debug!(error = %error, "transaction rejected before execution");
    ExecutionResult {
        status: ExecutionStatus::Halt,
        gas_used: gas_limit,
        gas_refunded: 0,
        output: Bytes::new(),
        logs: Vec::new(),
        created_address: None,
        revert_reason: None,
        error: Some(error),
    }
}

fn violation_error(violations: &[InvariantViolation]) -> VmError {
    let detail = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    VmError::Internal(format!("invariant violated: {detail}"))
}

// =============================================================================
// TESTS
// =============================================================================
