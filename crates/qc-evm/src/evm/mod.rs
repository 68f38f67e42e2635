//! # EVM Implementation
//!
//! The interpreter proper: machine components, gas pricing, world state and
//! the [`Evm`] that drives nested frames.
//!
//! ## Components
//!
//! - `stack.rs`, `memory.rs` - per-frame machine state
//! - `arithmetic.rs` - 256-bit word semantics
//! - `gas.rs` - cost tables, schedule, meter and dynamic formulas
//! - `opcodes.rs` - opcode metadata and the per-fork dispatch table
//! - `access.rs` - EIP-2929 warm/cold sets
//! - `transient.rs` - transient storage (EIP-1153)
//! - `state.rs` - journaled world state over a [`StateBackend`](crate::ports::StateBackend)
//! - `precompiles/` - precompiled contracts
//! - `frame.rs` - one call frame and the opcode loop
//! - `executor.rs` - [`Evm`], calls, creations and transactions

pub mod access;
pub mod arithmetic;
pub mod executor;
pub mod frame;
pub mod gas;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod state;
pub mod transient;

pub use access::AccessTracker;
pub use executor::Evm;
pub use frame::{Control, Frame};
pub use gas::{GasMeter, GasSchedule, GasScheduleOverride};
pub use memory::Memory;
pub use opcodes::{Opcode, OpcodeInfo, OpcodeTable};
pub use precompiles::{Precompile, StandardPrecompiles};
pub use stack::Stack;
pub use state::{JournalEntry, WorldState};
pub use transient::TransientStorage;
