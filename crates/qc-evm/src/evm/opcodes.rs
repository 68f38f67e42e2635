//! # EVM Opcodes
//!
//! Opcode decoding plus the per-fork [`OpcodeTable`]. The table resolves
//! availability and static gas for all 256 byte values once, so the
//! interpreter loop never branches on the hardfork to price an instruction.

use crate::domain::hardfork::Hardfork;
use crate::evm::gas::{costs, GasSchedule};
use std::fmt;

/// EVM opcode. PUSH, DUP, SWAP and LOG carry their width/index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    // 0x00 - Stop and Arithmetic
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,

    // 0x10 - Comparison & Bitwise
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Clz,

    // 0x20
    Keccak256,

    // 0x30 - Environmental Information
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,

    // 0x40 - Block Information
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    PrevRandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,

    // 0x50 - Stack, Memory, Storage, Flow
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    TLoad,
    TStore,
    MCopy,

    /// PUSH0..PUSH32; the payload is the immediate width.
    Push(u8),
    /// DUP1..DUP16.
    Dup(u8),
    /// SWAP1..SWAP16.
    Swap(u8),
    /// LOG0..LOG4; the payload is the topic count.
    Log(u8),

    // 0xF0 - System
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Opcode {
    /// Try to decode an opcode from a byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        let op = match byte {
            0x00 => Self::Stop,
            0x01 => Self::Add,
            0x02 => Self::Mul,
            0x03 => Self::Sub,
            0x04 => Self::Div,
            0x05 => Self::SDiv,
            0x06 => Self::Mod,
            0x07 => Self::SMod,
            0x08 => Self::AddMod,
            0x09 => Self::MulMod,
            0x0A => Self::Exp,
            0x0B => Self::SignExtend,

            0x10 => Self::Lt,
            0x11 => Self::Gt,
            0x12 => Self::SLt,
            0x13 => Self::SGt,
            0x14 => Self::Eq,
            0x15 => Self::IsZero,
            0x16 => Self::And,
            0x17 => Self::Or,
            0x18 => Self::Xor,
            0x19 => Self::Not,
            0x1A => Self::Byte,
            0x1B => Self::Shl,
            0x1C => Self::Shr,
            0x1D => Self::Sar,
            0x1E => Self::Clz,

            0x20 => Self::Keccak256,

            0x30 => Self::Address,
            0x31 => Self::Balance,
            0x32 => Self::Origin,
            0x33 => Self::Caller,
            0x34 => Self::CallValue,
            0x35 => Self::CallDataLoad,
            0x36 => Self::CallDataSize,
            0x37 => Self::CallDataCopy,
            0x38 => Self::CodeSize,
            0x39 => Self::CodeCopy,
            0x3A => Self::GasPrice,
            0x3B => Self::ExtCodeSize,
            0x3C => Self::ExtCodeCopy,
            0x3D => Self::ReturnDataSize,
            0x3E => Self::ReturnDataCopy,
            0x3F => Self::ExtCodeHash,

            0x40 => Self::BlockHash,
            0x41 => Self::Coinbase,
            0x42 => Self::Timestamp,
            0x43 => Self::Number,
            0x44 => Self::PrevRandao,
            0x45 => Self::GasLimit,
            0x46 => Self::ChainId,
            0x47 => Self::SelfBalance,
            0x48 => Self::BaseFee,
            0x49 => Self::BlobHash,
            0x4A => Self::BlobBaseFee,

            0x50 => Self::Pop,
            0x51 => Self::MLoad,
            0x52 => Self::MStore,
            0x53 => Self::MStore8,
            0x54 => Self::SLoad,
            0x55 => Self::SStore,
            0x56 => Self::Jump,
            0x57 => Self::JumpI,
            0x58 => Self::Pc,
            0x59 => Self::MSize,
            0x5A => Self::Gas,
            0x5B => Self::JumpDest,
            0x5C => Self::TLoad,
            0x5D => Self::TStore,
            0x5E => Self::MCopy,

            0x5F..=0x7F => Self::Push(byte - 0x5F),
            0x80..=0x8F => Self::Dup(byte - 0x7F),
            0x90..=0x9F => Self::Swap(byte - 0x8F),
            0xA0..=0xA4 => Self::Log(byte - 0xA0),

            0xF0 => Self::Create,
            0xF1 => Self::Call,
            0xF2 => Self::CallCode,
            0xF3 => Self::Return,
            0xF4 => Self::DelegateCall,
            0xF5 => Self::Create2,
            0xFA => Self::StaticCall,
            0xFD => Self::Revert,
            0xFE => Self::Invalid,
            0xFF => Self::SelfDestruct,

            _ => return None,
        };
        Some(op)
    }

    /// First fork in which the opcode is defined.
    #[must_use]
    pub fn introduced_in(self) -> Hardfork {
        match self {
            Self::DelegateCall => Hardfork::Homestead,
            Self::ReturnDataSize | Self::ReturnDataCopy | Self::StaticCall | Self::Revert => {
                Hardfork::Byzantium
            }
            Self::Shl | Self::Shr | Self::Sar | Self::ExtCodeHash | Self::Create2 => {
                Hardfork::Constantinople
            }
            Self::ChainId | Self::SelfBalance => Hardfork::Istanbul,
            Self::BaseFee => Hardfork::London,
            Self::Push(0) => Hardfork::Shanghai,
            Self::TLoad | Self::TStore | Self::MCopy | Self::BlobHash | Self::BlobBaseFee => {
                Hardfork::Cancun
            }
            Self::Clz => Hardfork::Osaka,
            _ => Hardfork::Frontier,
        }
    }

    /// Immediate bytes following the opcode.
    #[must_use]
    pub fn immediate_size(self) -> usize {
        match self {
            Self::Push(n) => usize::from(n),
            _ => 0,
        }
    }

    /// Static gas at `fork`. Dynamic parts are charged by the interpreter.
    #[must_use]
    pub fn static_gas(self, fork: Hardfork, schedule: &GasSchedule) -> u64 {
        // From Berlin, account and slot access is priced by the access tracker.
        let pre_berlin = |cost: u64| if fork.has_access_lists() { 0 } else { cost };

        match self {
            Self::Stop | Self::Return | Self::Revert | Self::Invalid | Self::SStore => costs::ZERO,

            Self::Add | Self::Sub | Self::Lt | Self::Gt | Self::SLt | Self::SGt | Self::Eq
            | Self::IsZero | Self::And | Self::Or | Self::Xor | Self::Not | Self::Byte
            | Self::Shl | Self::Shr | Self::Sar | Self::CallDataLoad | Self::CallDataCopy
            | Self::CodeCopy | Self::ReturnDataCopy | Self::MLoad | Self::MStore
            | Self::MStore8 | Self::MCopy | Self::BlobHash | Self::Dup(_) | Self::Swap(_) => {
                costs::VERY_LOW
            }
            Self::Push(0) => costs::BASE,
            Self::Push(_) => costs::VERY_LOW,

            Self::Mul | Self::Div | Self::SDiv | Self::Mod | Self::SMod | Self::SignExtend
            | Self::SelfBalance | Self::Clz => costs::LOW,
            Self::AddMod | Self::MulMod | Self::Jump => costs::MID,
            Self::Exp | Self::JumpI => costs::HIGH,
            Self::JumpDest => costs::JUMPDEST,

            Self::Keccak256 => costs::KECCAK256,

            Self::Address | Self::Origin | Self::Caller | Self::CallValue | Self::CallDataSize
            | Self::CodeSize | Self::GasPrice | Self::ReturnDataSize | Self::Coinbase
            | Self::Timestamp | Self::Number | Self::PrevRandao | Self::GasLimit
            | Self::ChainId | Self::BaseFee | Self::BlobBaseFee | Self::Pop | Self::Pc
            | Self::MSize | Self::Gas => costs::BASE,

            Self::Balance => pre_berlin(schedule.balance),
            Self::ExtCodeSize | Self::ExtCodeCopy => pre_berlin(schedule.ext_code),
            Self::ExtCodeHash => pre_berlin(schedule.ext_code_hash),
            Self::SLoad => pre_berlin(schedule.sload),
            Self::Call | Self::CallCode | Self::DelegateCall | Self::StaticCall => {
                pre_berlin(schedule.call)
            }

            Self::BlockHash => costs::BLOCKHASH,
            Self::TLoad | Self::TStore => schedule.warm_access,
            Self::Log(_) => costs::LOG,
            Self::Create | Self::Create2 => costs::CREATE,
            Self::SelfDestruct => schedule.selfdestruct,
        }
    }

    /// Returns true if this opcode ends the frame.
    #[must_use]
    pub fn is_terminating(self) -> bool {
        matches!(
            self,
            Self::Stop | Self::Return | Self::Revert | Self::Invalid | Self::SelfDestruct
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(n) => write!(f, "PUSH{n}"),
            Self::Dup(n) => write!(f, "DUP{n}"),
            Self::Swap(n) => write!(f, "SWAP{n}"),
            Self::Log(n) => write!(f, "LOG{n}"),
            Self::Keccak256 => f.write_str("KECCAK256"),
            other => f.write_str(&format!("{other:?}").to_ascii_uppercase()),
        }
    }
}

// =============================================================================
// OPCODE TABLE
// =============================================================================

/// Resolved entry for one byte value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Decoded opcode, `None` if undefined or not yet active.
    pub opcode: Option<Opcode>,
    /// Static gas charged before the opcode body runs.
    pub static_gas: u64,
}

/// Availability and static cost of every byte value at one fork.
#[derive(Clone, Debug)]
pub struct OpcodeTable {
    fork: Hardfork,
    entries: [OpcodeInfo; 256],
}

impl OpcodeTable {
    /// Resolves the table for `fork` priced by `schedule`.
    #[must_use]
    pub fn new(fork: Hardfork, schedule: &GasSchedule) -> Self {
        let mut entries = [OpcodeInfo {
            opcode: None,
            static_gas: 0,
        }; 256];
        for (byte, entry) in (0..=u8::MAX).zip(entries.iter_mut()) {
            if let Some(op) = Opcode::from_byte(byte) {
                if fork.is_enabled_in(op.introduced_in()) {
                    *entry = OpcodeInfo {
                        opcode: Some(op),
                        static_gas: op.static_gas(fork, schedule),
                    };
                }
            }
        }
        Self { fork, entries }
    }

    /// Fork the table was built for.
    #[must_use]
    pub fn fork(&self) -> Hardfork {
        self.fork
    }

    /// Entry for `byte`.
    #[inline]
    #[must_use]
    pub fn get(&self, byte: u8) -> OpcodeInfo {
        self.entries[usize::from(byte)]
    }
}

// =============================================================================
// TESTS
// =============================================================================
