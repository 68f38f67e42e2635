//! # Execution Frame
//!
//! One activation of bytecode: program counter, stack, memory and gas meter
//! plus the read-only call context. [`Frame::step`] decodes and executes a
//! single opcode against the owning [`Evm`]; nested calls and creations
//! recurse through [`Evm::call`] and [`Evm::create`].
//!
//! Every opcode follows the same order: static gas from the fork's opcode
//! table, then operands, then dynamic gas (memory growth, warm/cold access,
//! byte lengths), then the static-context check, then side effects. Nothing
//! observable happens before the opcode has paid for itself.

use crate::domain::entities::{CallInput, CallKind, CallResult, CreateInput, CreateScheme, Log};
use crate::domain::hardfork::Hardfork;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::VmError;
use crate::evm::arithmetic;
use crate::evm::executor::Evm;
use crate::evm::gas::{self, costs, GasMeter, SstoreValues};
use crate::evm::memory::{Memory, MAX_MEMORY_OFFSET, WORD_SIZE};
use crate::evm::opcodes::Opcode;
use crate::evm::stack::Stack;
use crate::ports::outbound::{MemoryDelta, StepTrace, Tracer};
use std::collections::HashSet;

/// Outcome of a single step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// Keep executing.
    Continue,
    /// STOP, SELFDESTRUCT or end of code.
    Stop,
    /// RETURN with its payload.
    Return(Bytes),
    /// REVERT with its payload.
    Revert(Bytes),
}

/// A running call or creation.
#[derive(Clone, Debug)]
pub struct Frame {
    kind: CallKind,
    code: Bytes,
    jump_dests: HashSet<usize>,
    pc: usize,
    stack: Stack,
    memory: Memory,
    gas: GasMeter,
    input: Bytes,
    return_data: Bytes,
    caller: Address,
    address: Address,
    value: U256,
    is_static: bool,
    depth: usize,
}

impl Frame {
    /// Frame running `code` for a CALL-family request.
    #[must_use]
    pub fn for_call(input: CallInput, code: Bytes, depth: usize) -> Self {
        Self {
            kind: input.kind,
            jump_dests: analyze_jump_dests(code.as_slice()),
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas: GasMeter::new(input.gas_limit),
            input: input.input,
            return_data: Bytes::new(),
            caller: input.caller,
            address: input.address,
            value: input.value,
            is_static: input.is_static,
            depth,
        }
    }

    /// Frame running init code for a creation at `address`.
    #[must_use]
    pub fn for_create(input: &CreateInput, address: Address, depth: usize) -> Self {
        let kind = match input.scheme {
            CreateScheme::Create => CallKind::Create,
            CreateScheme::Create2 { .. } => CallKind::Create2,
        };
        Self {
            kind,
            jump_dests: analyze_jump_dests(input.init_code.as_slice()),
            code: input.init_code.clone(),
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas: GasMeter::new(input.gas_limit),
            input: Bytes::new(),
            return_data: Bytes::new(),
            caller: input.caller,
            address,
            value: input.value,
            is_static: false,
            depth,
        }
    }

    /// Call or create variant.
    #[must_use]
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Depth of this frame (root = 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// ADDRESS inside the frame.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Read-only frame.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Gas meter.
    #[must_use]
    pub fn gas(&self) -> &GasMeter {
        &self.gas
    }

    /// Operand stack.
    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Linear memory.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Runs until the frame stops, returns, reverts or halts.
    ///
    /// Contract-level failures become an unsuccessful [`CallResult`].
    ///
    /// # Errors
    ///
    /// Only fatal host errors (see [`VmError::is_fatal`]) are returned.
    pub fn run<T: Tracer>(&mut self, evm: &mut Evm<T>) -> Result<CallResult, VmError> {
        loop {
            match self.step(evm) {
                Ok(Control::Continue) => {}
                Ok(Control::Stop) => {
                    return Ok(CallResult::success(
                        self.gas.remaining(),
                        self.gas.refund(),
                        Bytes::new(),
                    ))
                }
                Ok(Control::Return(output)) => {
                    return Ok(CallResult::success(
                        self.gas.remaining(),
                        self.gas.refund(),
                        output,
                    ))
                }
                Ok(Control::Revert(output)) => {
                    return Ok(CallResult::revert(self.gas.remaining(), output))
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => return Ok(CallResult::halt(error, self.gas.limit())),
            }
        }
    }

    /// Executes the opcode at the program counter.
    ///
    /// Running past the end of code is an implicit STOP.
    ///
    /// # Errors
    ///
    /// Returns the halt reason if the opcode fails.
    pub fn step<T: Tracer>(&mut self, evm: &mut Evm<T>) -> Result<Control, VmError> {
        let Some(&byte) = self.code.as_slice().get(self.pc) else {
            return Ok(Control::Stop);
        };
        if !evm.tracer.is_enabled() {
            return self.execute(byte, evm);
        }

        let pc = self.pc;
        let gas_before = self.gas.remaining();
        let stack = self.stack.as_slice().to_vec();
        let checkpoint = evm.state.checkpoint();
        self.memory.take_last_write();

        let result = self.execute(byte, evm);

        let memory_delta = self.memory.take_last_write().and_then(|(offset, len)| {
            self.memory
                .as_slice()
                .get(offset..offset + len)
                .map(|data| MemoryDelta {
                    offset,
                    data: Bytes::from_slice(data),
                })
        });
        let storage_deltas = if enters_frame(evm.table.get(byte).opcode) {
            Vec::new()
        } else {
            evm.state.storage_deltas_since(checkpoint)
        };

        evm.tracer.step(&StepTrace {
            depth: self.depth,
            pc,
            opcode: byte,
            gas_remaining: gas_before,
            gas_cost: gas_before.saturating_sub(self.gas.remaining()),
            stack,
            memory_delta,
            storage_deltas,
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }

    fn execute<T: Tracer>(&mut self, byte: u8, evm: &mut Evm<T>) -> Result<Control, VmError> {
        let info = evm.table.get(byte);
        let Some(opcode) = info.opcode else {
            return Err(VmError::InvalidOpcode(byte));
        };
        self.gas.charge(info.static_gas)?;

        let pc = self.pc;
        self.pc += 1 + opcode.immediate_size();
        let fork = evm.table.fork();

        match opcode {
            // =================================================================
            // STOP & ARITHMETIC
            // =================================================================
            Opcode::Stop => return Ok(Control::Stop),
            Opcode::Add => self.binary(|a, b| a.overflowing_add(b).0)?,
            Opcode::Mul => self.binary(|a, b| a.overflowing_mul(b).0)?,
            Opcode::Sub => self.binary(|a, b| a.overflowing_sub(b).0)?,
            Opcode::Div => self.binary(arithmetic::div)?,
            Opcode::SDiv => self.binary(arithmetic::signed_div)?,
            Opcode::Mod => self.binary(arithmetic::rem)?,
            Opcode::SMod => self.binary(arithmetic::signed_mod)?,
            Opcode::AddMod => {
                let (a, b, n) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.stack.push(arithmetic::add_mod(a, b, n))?;
            }
            Opcode::MulMod => {
                let (a, b, n) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.stack.push(arithmetic::mul_mod(a, b, n))?;
            }
            Opcode::Exp => {
                let base = self.stack.pop()?;
                let exponent = self.stack.pop()?;
                self.gas.charge(gas::exp_dynamic_cost(&evm.schedule, exponent))?;
                self.stack.push(arithmetic::exp(base, exponent))?;
            }
            Opcode::SignExtend => self.binary(arithmetic::sign_extend)?,

            // =================================================================
            // COMPARISON & BITWISE
            // =================================================================
            Opcode::Lt => self.binary(|a, b| word_from_bool(a < b))?,
            Opcode::Gt => self.binary(|a, b| word_from_bool(a > b))?,
            Opcode::SLt => self.binary(|a, b| word_from_bool(arithmetic::signed_lt(a, b)))?,
            Opcode::SGt => self.binary(|a, b| word_from_bool(arithmetic::signed_lt(b, a)))?,
            Opcode::Eq => self.binary(|a, b| word_from_bool(a == b))?,
            Opcode::IsZero => self.unary(|a| word_from_bool(a.is_zero()))?,
            Opcode::And => self.binary(|a, b| a & b)?,
            Opcode::Or => self.binary(|a, b| a | b)?,
            Opcode::Xor => self.binary(|a, b| a ^ b)?,
            Opcode::Not => self.unary(|a| !a)?,
            Opcode::Byte => self.binary(arithmetic::byte)?,
            Opcode::Shl => self.binary(arithmetic::shl)?,
            Opcode::Shr => self.binary(arithmetic::shr)?,
            Opcode::Sar => self.binary(arithmetic::sar)?,
            Opcode::Clz => self.unary(arithmetic::clz)?,

            Opcode::Keccak256 => {
                let offset = self.stack.pop()?;
                let len = self.stack.pop()?;
                let (offset, len) = self.memory_range(offset, len)?;
                self.gas.charge(gas::keccak256_dynamic_cost(len))?;
                let hash = keccak256(&self.memory.read(offset, len));
                self.stack.push(hash.to_word())?;
            }

            // =================================================================
            // ENVIRONMENT
            // =================================================================
            Opcode::Address => self.stack.push(self.address.to_word())?,
            Opcode::Balance => {
                let address = self.pop_address()?;
                self.charge_account_access(evm, address)?;
                let balance = evm.state.balance(&address)?;
                self.stack.push(balance)?;
            }
            Opcode::Origin => self.stack.push(evm.tx.origin.to_word())?,
            Opcode::Caller => self.stack.push(self.caller.to_word())?,
            Opcode::CallValue => self.stack.push(self.value)?,
            Opcode::CallDataLoad => {
                let offset = saturating_usize(self.stack.pop()?);
                let mut word = [0u8; 32];
                if let Some(rest) = self.input.as_slice().get(offset..) {
                    let n = rest.len().min(WORD_SIZE);
                    word[..n].copy_from_slice(&rest[..n]);
                }
                self.stack.push(U256::from_big_endian(&word))?;
            }
            Opcode::CallDataSize => self.stack.push(U256::from(self.input.len()))?,
            Opcode::CallDataCopy => {
                let (dest, source_offset, len) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                let (dest, len) = self.copy_range(dest, len)?;
                self.memory
                    .write_padded(dest, self.input.as_slice(), saturating_usize(source_offset), len);
            }
            Opcode::CodeSize => self.stack.push(U256::from(self.code.len()))?,
            Opcode::CodeCopy => {
                let (dest, source_offset, len) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                let (dest, len) = self.copy_range(dest, len)?;
                self.memory
                    .write_padded(dest, self.code.as_slice(), saturating_usize(source_offset), len);
            }
            Opcode::GasPrice => self.stack.push(evm.tx.gas_price)?,
            Opcode::ExtCodeSize => {
                let address = self.pop_address()?;
                self.charge_account_access(evm, address)?;
                let size = evm.state.code(&address)?.len();
                self.stack.push(U256::from(size))?;
            }
            Opcode::ExtCodeCopy => {
                let address = self.pop_address()?;
                let (dest, source_offset, len) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.charge_account_access(evm, address)?;
                let (dest, len) = self.copy_range(dest, len)?;
                let code = evm.state.code(&address)?;
                self.memory
                    .write_padded(dest, code.as_slice(), saturating_usize(source_offset), len);
            }
            Opcode::ReturnDataSize => self.stack.push(U256::from(self.return_data.len()))?,
            Opcode::ReturnDataCopy => {
                let (dest, source_offset, len) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                let (dest, copy_len) = self.copy_range(dest, len)?;
                let available = self.return_data.len();
                let (end, overflow) = source_offset.overflowing_add(len);
                if overflow || end > U256::from(available) {
                    return Err(VmError::ReturnDataOutOfBounds {
                        offset: source_offset,
                        size: len,
                        available,
                    });
                }
                self.memory.write_padded(
                    dest,
                    self.return_data.as_slice(),
                    saturating_usize(source_offset),
                    copy_len,
                );
            }
            Opcode::ExtCodeHash => {
                let address = self.pop_address()?;
                self.charge_account_access(evm, address)?;
                let hash = if evm.state.is_empty(&address)? {
                    U256::zero()
                } else {
                    evm.state.code_hash(&address)?.map_or_else(U256::zero, |h| h.to_word())
                };
                self.stack.push(hash)?;
            }

            // =================================================================
            // BLOCK
            // =================================================================
            Opcode::BlockHash => {
                let number = self.stack.pop()?;
                let current = U256::from(evm.block.number);
                let hash = if number < current && current - number <= U256::from(256) {
                    evm.state
                        .block_hash(number.low_u64())?
                        .map_or_else(U256::zero, |h| h.to_word())
                } else {
                    U256::zero()
                };
                self.stack.push(hash)?;
            }
            Opcode::Coinbase => self.stack.push(evm.block.coinbase.to_word())?,
            Opcode::Timestamp => self.stack.push(U256::from(evm.block.timestamp))?,
            Opcode::Number => self.stack.push(U256::from(evm.block.number))?,
            Opcode::PrevRandao => {
                let value = if fork.is_enabled_in(Hardfork::Merge) {
                    evm.block.prevrandao.to_word()
                } else {
                    evm.block.difficulty
                };
                self.stack.push(value)?;
            }
            Opcode::GasLimit => self.stack.push(U256::from(evm.block.gas_limit))?,
            Opcode::ChainId => self.stack.push(U256::from(evm.block.chain_id))?,
            Opcode::SelfBalance => {
                let balance = evm.state.balance(&self.address)?;
                self.stack.push(balance)?;
            }
            Opcode::BaseFee => self.stack.push(evm.block.base_fee)?,
            Opcode::BlobHash => {
                let index = saturating_usize(self.stack.pop()?);
                let hash = evm.tx.blob_hashes.get(index).map_or_else(U256::zero, Hash::to_word);
                self.stack.push(hash)?;
            }
            Opcode::BlobBaseFee => self.stack.push(evm.block.blob_base_fee)?,

            // =================================================================
            // STACK, MEMORY, STORAGE & FLOW
            // =================================================================
            Opcode::Pop => {
                self.stack.pop()?;
            }
            Opcode::MLoad => {
                let offset = self.stack.pop()?;
                let (offset, _) = self.memory_range(offset, U256::from(WORD_SIZE))?;
                self.stack.push(U256::from_big_endian(&self.memory.read_word(offset)))?;
            }
            Opcode::MStore => {
                let offset = self.stack.pop()?;
                let value = self.stack.pop()?;
                let (offset, _) = self.memory_range(offset, U256::from(WORD_SIZE))?;
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                self.memory.write_word(offset, &word);
            }
            Opcode::MStore8 => {
                let offset = self.stack.pop()?;
                let value = self.stack.pop()?;
                let (offset, _) = self.memory_range(offset, U256::one())?;
                self.memory.write_byte(offset, value.byte(0));
            }
            Opcode::SLoad => {
                let key = self.stack.pop()?;
                if fork.has_access_lists() {
                    self.gas.charge(evm.access.access_slot(self.address, key))?;
                }
                let value = evm.state.storage(&self.address, key)?;
                self.stack.push(value)?;
            }
            Opcode::SStore => self.sstore(evm, fork)?,
            Opcode::Jump => {
                let dest = self.stack.pop()?;
                self.jump(dest)?;
            }
            Opcode::JumpI => {
                let dest = self.stack.pop()?;
                let condition = self.stack.pop()?;
                if !condition.is_zero() {
                    self.jump(dest)?;
                }
            }
            Opcode::Pc => self.stack.push(U256::from(pc))?,
            Opcode::MSize => self.stack.push(U256::from(self.memory.size()))?,
            Opcode::Gas => self.stack.push(U256::from(self.gas.remaining()))?,
            Opcode::JumpDest => {}
            Opcode::TLoad => {
                let key = self.stack.pop()?;
                self.stack.push(evm.state.transient(&self.address, key))?;
            }
            Opcode::TStore => {
                let key = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.ensure_writable()?;
                evm.state.set_transient(self.address, key, value);
            }
            Opcode::MCopy => {
                let (dest, source, len) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                let (dest, len) = self.copy_range(dest, len)?;
                let (source, _) = self.memory_range(source, U256::from(len))?;
                self.memory.copy_within(dest, source, len);
            }

            Opcode::Push(n) => {
                let n = usize::from(n);
                let start = pc + 1;
                let available = self.code.len().saturating_sub(start).min(n);
                // A truncated immediate at the end of code is right-padded with zeros.
                let mut word = [0u8; 32];
                if let Some(bytes) = self.code.as_slice().get(start..start + available) {
                    word[WORD_SIZE - n..WORD_SIZE - n + available].copy_from_slice(bytes);
                }
                self.stack.push(U256::from_big_endian(&word))?;
            }
            Opcode::Dup(n) => self.stack.dup(usize::from(n))?,
            Opcode::Swap(n) => self.stack.swap(usize::from(n))?,

            Opcode::Log(n) => {
                let offset = self.stack.pop()?;
                let len = self.stack.pop()?;
                let topics = (0..n)
                    .map(|_| self.stack.pop().map(Hash::from_word))
                    .collect::<Result<Vec<_>, _>>()?;
                let (offset, len) = self.memory_range(offset, len)?;
                self.gas.charge(gas::log_dynamic_cost(len, topics.len()))?;
                self.ensure_writable()?;
                let data = Bytes::from_vec(self.memory.read(offset, len));
                evm.logs.push(Log::new(self.address, topics, data));
            }

            // =================================================================
            // SYSTEM
            // =================================================================
            Opcode::Create => self.create(evm, false)?,
            Opcode::Create2 => self.create(evm, true)?,
            Opcode::Call => self.call(evm, CallKind::Call)?,
            Opcode::CallCode => self.call(evm, CallKind::CallCode)?,
            Opcode::DelegateCall => self.call(evm, CallKind::DelegateCall)?,
            Opcode::StaticCall => self.call(evm, CallKind::StaticCall)?,
            Opcode::Return => {
                let output = self.pop_output()?;
                return Ok(Control::Return(output));
            }
            Opcode::Revert => {
                let output = self.pop_output()?;
                return Ok(Control::Revert(output));
            }
            Opcode::Invalid => return Err(VmError::InvalidOpcode(byte)),
            Opcode::SelfDestruct => {
                self.selfdestruct(evm, fork)?;
                return Ok(Control::Stop);
            }
        }

        Ok(Control::Continue)
    }

    // -------------------------------------------------------------------------
    // Operand helpers
    // -------------------------------------------------------------------------

    fn unary(&mut self, op: impl FnOnce(U256) -> U256) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        self.stack.push(op(a))
    }

    fn binary(&mut self, op: impl FnOnce(U256, U256) -> U256) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(op(a, b))
    }

    fn pop_address(&mut self) -> Result<Address, VmError> {
        self.stack.pop().map(Address::from_word)
    }

    fn pop_output(&mut self) -> Result<Bytes, VmError> {
        let offset = self.stack.pop()?;
        let len = self.stack.pop()?;
        let (offset, len) = self.memory_range(offset, len)?;
        Ok(Bytes::from_vec(self.memory.read(offset, len)))
    }

    fn ensure_writable(&self) -> Result<(), VmError> {
        if self.is_static {
            Err(VmError::StaticCallViolation)
        } else {
            Ok(())
        }
    }

    fn jump(&mut self, dest: U256) -> Result<(), VmError> {
        let target = (dest <= U256::from(usize::MAX)).then(|| dest.as_usize());
        match target {
            Some(target) if self.jump_dests.contains(&target) => {
                self.pc = target;
                Ok(())
            }
            _ => Err(VmError::InvalidJump(dest)),
        }
    }

    /// Charges expansion for `[offset, offset + len)` and grows memory.
    ///
    /// A zero length touches nothing, whatever the offset. Ranges ending past
    /// [`MAX_MEMORY_OFFSET`] are out of gas.
    fn memory_range(&mut self, offset: U256, len: U256) -> Result<(usize, usize), VmError> {
        if len.is_zero() {
            return Ok((0, 0));
        }
        let limit = U256::from(MAX_MEMORY_OFFSET);
        if offset > limit || len > limit {
            return Err(VmError::OutOfGas);
        }
        let (offset, len) = (offset.as_usize(), len.as_usize());
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= MAX_MEMORY_OFFSET)
            .ok_or(VmError::OutOfGas)?;
        self.gas.charge(self.memory.expansion_cost(end))?;
        self.memory.resize(end);
        Ok((offset, len))
    }

    /// Memory range plus the per-word copy charge.
    fn copy_range(&mut self, dest: U256, len: U256) -> Result<(usize, usize), VmError> {
        let (dest, len) = self.memory_range(dest, len)?;
        self.gas.charge(gas::copy_cost(len))?;
        Ok((dest, len))
    }

    /// EIP-2929 account access charge (Berlin+). Earlier forks price
    /// account reads through the static table.
    fn charge_account_access<T: Tracer>(
        &mut self,
        evm: &mut Evm<T>,
        address: Address,
    ) -> Result<(), VmError> {
        if evm.table.fork().has_access_lists() {
            self.gas.charge(evm.access.access_address(address))?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // State-changing opcodes
    // -------------------------------------------------------------------------

    fn sstore<T: Tracer>(&mut self, evm: &mut Evm<T>, fork: Hardfork) -> Result<(), VmError> {
        if fork.has_net_sstore_metering() && self.gas.remaining() <= costs::SSTORE_SENTRY {
            return Err(VmError::OutOfGas);
        }
        let key = self.stack.pop()?;
        let new = self.stack.pop()?;

        let is_cold = fork.has_access_lists() && !evm.access.is_slot_warm(&self.address, key);
        evm.access.warm_slot(self.address, key);

        let values = SstoreValues {
            original: evm.state.original_storage(&self.address, key)?,
            current: evm.state.storage(&self.address, key)?,
            new,
        };
        self.gas
            .charge(gas::sstore_cost(&evm.schedule, fork, values, is_cold))?;
        self.ensure_writable()?;

        self.gas
            .record_refund(gas::sstore_refund(&evm.schedule, fork, values));
        evm.state.set_storage(self.address, key, new)?;
        Ok(())
    }

    fn call<T: Tracer>(&mut self, evm: &mut Evm<T>, kind: CallKind) -> Result<(), VmError> {
        let fork = evm.table.fork();
        let requested_gas = self.stack.pop()?;
        let target = self.pop_address()?;
        let value = match kind {
            CallKind::Call | CallKind::CallCode => self.stack.pop()?,
            _ => U256::zero(),
        };
        let (in_offset, in_len) = (self.stack.pop()?, self.stack.pop()?);
        let (out_offset, out_len) = (self.stack.pop()?, self.stack.pop()?);

        let (in_offset, in_len) = self.memory_range(in_offset, in_len)?;
        let (out_offset, out_len) = self.memory_range(out_offset, out_len)?;
        self.charge_account_access(evm, target)?;

        let has_value = !value.is_zero();
        let creates_account = kind == CallKind::Call
            && !evm.precompiles.is_precompile(&target, fork)
            && if fork.has_empty_account_semantics() {
                has_value && evm.state.is_empty(&target)?
            } else {
                !evm.state.exists(&target)?
            };
        self.gas.charge(gas::call_extra_cost(has_value, creates_account))?;
        if kind == CallKind::Call && has_value {
            self.ensure_writable()?;
        }

        let forwarded = gas::forwarded_call_gas(fork, self.gas.remaining(), requested_gas)?;
        self.gas.charge(forwarded)?;
        let stipend = if has_value { costs::CALL_STIPEND } else { 0 };

        let input = CallInput {
            kind,
            caller: if kind == CallKind::DelegateCall { self.caller } else { self.address },
            address: match kind {
                CallKind::Call | CallKind::StaticCall => target,
                _ => self.address,
            },
            code_address: target,
            value: if kind == CallKind::DelegateCall { self.value } else { value },
            transfers_value: matches!(kind, CallKind::Call | CallKind::CallCode),
            input: Bytes::from_vec(self.memory.read(in_offset, in_len)),
            gas_limit: forwarded + stipend,
            is_static: self.is_static || kind == CallKind::StaticCall,
        };
        let result = evm.call(input)?;

        let copy_len = out_len.min(result.output.len());
        if let Some(output) = result.output.as_slice().get(..copy_len) {
            self.memory.write(out_offset, output);
        }
        self.gas.credit(result.gas_left);
        if result.success {
            self.gas.record_refund(result.gas_refund);
        }
        self.return_data = result.output;
        self.stack.push(word_from_bool(result.success))
    }

    fn create<T: Tracer>(&mut self, evm: &mut Evm<T>, is_create2: bool) -> Result<(), VmError> {
        let fork = evm.table.fork();
        let value = self.stack.pop()?;
        let (offset, len) = (self.stack.pop()?, self.stack.pop()?);
        let scheme = if is_create2 {
            CreateScheme::Create2 { salt: self.stack.pop()? }
        } else {
            CreateScheme::Create
        };

        let (offset, len) = self.memory_range(offset, len)?;
        if fork.is_enabled_in(Hardfork::Shanghai) && len > evm.config.max_init_code_size {
            return Err(VmError::InitCodeSizeExceeded {
                size: len,
                max: evm.config.max_init_code_size,
            });
        }
        self.gas
            .charge(gas::create_dynamic_cost(&evm.schedule, len, is_create2))?;
        self.ensure_writable()?;

        let gas_limit = gas::forwarded_create_gas(fork, self.gas.remaining());
        self.gas.charge(gas_limit)?;

        let result = evm.create(CreateInput {
            scheme,
            caller: self.address,
            value,
            init_code: Bytes::from_vec(self.memory.read(offset, len)),
            gas_limit,
        })?;

        self.gas.credit(result.gas_left);
        if result.success {
            self.gas.record_refund(result.gas_refund);
        }
        self.return_data = if result.is_revert() {
            result.output
        } else {
            Bytes::new()
        };
        let created = match result.created_address {
            Some(address) if result.success => address.to_word(),
            _ => U256::zero(),
        };
        self.stack.push(created)
    }

    fn selfdestruct<T: Tracer>(&mut self, evm: &mut Evm<T>, fork: Hardfork) -> Result<(), VmError> {
        let beneficiary = self.pop_address()?;

        if fork.has_access_lists() && !evm.access.is_address_warm(&beneficiary) {
            self.gas.charge(evm.schedule.cold_account_access)?;
            evm.access.warm_address(beneficiary);
        }
        let balance = evm.state.balance(&self.address)?;
        let exists = evm.state.exists(&beneficiary)?;
        let empty = evm.state.is_empty(&beneficiary)?;
        self.gas
            .charge(gas::selfdestruct_extra_cost(fork, exists, empty, balance))?;
        self.ensure_writable()?;

        let first = evm.self_destruct(self.address, beneficiary)?;
        if first && !fork.has_reduced_refunds() {
            self.gas.record_refund(evm.schedule.selfdestruct_refund);
        }
        Ok(())
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Offsets of every JUMPDEST that is not inside PUSH data.
#[must_use]
pub fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;

    while i < code.len() {
        let op = code[i];
        if op == 0x5B {
            dests.insert(i);
        }
        if (0x60..=0x7F).contains(&op) {
            i += usize::from(op - 0x5F);
        }
        i += 1;
    }

    dests
}

fn word_from_bool(value: bool) -> U256 {
    U256::from(u8::from(value))
}

fn saturating_usize(value: U256) -> usize {
    if value > U256::from(usize::MAX) {
        usize::MAX
    } else {
        value.as_usize()
    }
}

fn enters_frame(opcode: Option<Opcode>) -> bool {
    matches!(
        opcode,
        Some(
            Opcode::Call
                | Opcode::CallCode
                | Opcode::DelegateCall
                | Opcode::StaticCall
                | Opcode::Create
                | Opcode::Create2
        )
    )
}

// =============================================================================
// TESTS
// =============================================================================
