//! # Domain Entities
//!
//! Accounts, execution environments, call requests and results.

use crate::domain::services::code_hash;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::VmError;
use serde::{Deserialize, Serialize};

// =============================================================================
// ACCOUNT
// =============================================================================

/// Account as seen by the interpreter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Balance in wei.
    pub balance: U256,
    /// Transaction count for EOAs, creation count for contracts.
    pub nonce: u64,
    /// Runtime bytecode.
    pub code: Bytes,
    /// keccak256 of `code`.
    pub code_hash: Hash,
}

impl Account {
    /// Empty code hash (keccak256 of empty bytes).
    pub const EMPTY_CODE_HASH: Hash = Hash([
        0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
        0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
        0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
        0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
    ]);

    /// Creates an account without code.
    #[must_use]
    pub fn new_eoa(balance: U256, nonce: u64) -> Self {
        Self {
            balance,
            nonce,
            code: Bytes::new(),
            code_hash: Self::EMPTY_CODE_HASH,
        }
    }

    /// Creates a deployed contract (nonce 1, as EIP-161 leaves it).
    #[must_use]
    pub fn new_contract(balance: U256, code: Bytes) -> Self {
        Self {
            balance,
            nonce: 1,
            code_hash: code_hash(code.as_slice()),
            code,
        }
    }

    /// Returns true if the account carries code.
    #[must_use]
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// EIP-161 emptiness: zero balance, zero nonce, no code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && !self.has_code()
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new_eoa(U256::zero(), 0)
    }
}

// =============================================================================
// BLOCK & TRANSACTION ENVIRONMENT
// =============================================================================

/// Block-level values visible to bytecode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockContext {
    /// Chain ID (EIP-155).
    pub chain_id: u64,
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Fee recipient.
    pub coinbase: Address,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Base fee (EIP-1559).
    pub base_fee: U256,
    /// Proof-of-work difficulty, served by 0x44 before the Merge.
    pub difficulty: U256,
    /// Beacon randomness, served by 0x44 from the Merge on.
    pub prevrandao: Hash,
    /// Blob base fee (EIP-7516).
    pub blob_base_fee: U256,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            chain_id: 1,
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            gas_limit: 30_000_000,
            base_fee: U256::zero(),
            difficulty: U256::zero(),
            prevrandao: Hash::ZERO,
            blob_base_fee: U256::one(),
        }
    }
}

/// Transaction-level values visible to bytecode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxEnv {
    /// Transaction signer (ORIGIN).
    pub origin: Address,
    /// Effective gas price (GASPRICE).
    pub gas_price: U256,
    /// Versioned blob hashes (BLOBHASH).
    pub blob_hashes: Vec<Hash>,
}

/// EIP-2930 access list entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListItem {
    /// Account to pre-warm.
    pub address: Address,
    /// Slots of `address` to pre-warm.
    pub storage_keys: Vec<U256>,
}

/// A signed transaction, reduced to what execution needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    /// Sender.
    pub caller: Address,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Calldata, or init code when creating.
    pub data: Bytes,
    /// Gas limit including intrinsic gas.
    pub gas_limit: u64,
    /// Effective gas price.
    pub gas_price: U256,
    /// EIP-2930 access list.
    pub access_list: Vec<AccessListItem>,
    /// EIP-4844 versioned hashes.
    pub blob_hashes: Vec<Hash>,
}

impl Transaction {
    /// Returns true for contract-creation transactions.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// A top-level call executed inside the current transaction, without
/// intrinsic gas or nonce handling. Used by harnesses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Sender.
    pub caller: Address,
    /// Recipient, `None` to run `data` as init code.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Calldata or init code.
    pub data: Bytes,
    /// Gas available to the root frame.
    pub gas_limit: u64,
    /// Run the root frame read-only.
    pub is_static: bool,
}

// =============================================================================
// CALL REQUESTS
// =============================================================================

/// Kind of frame being entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// CALL, or a top-level message call.
    Call,
    /// CALLCODE.
    CallCode,
    /// DELEGATECALL.
    DelegateCall,
    /// STATICCALL.
    StaticCall,
    /// CREATE, or a top-level creation.
    Create,
    /// CREATE2.
    Create2,
}

impl CallKind {
    /// Returns true for CREATE and CREATE2.
    #[must_use]
    pub fn is_create(self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }
}

/// Request to run code at an existing address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInput {
    /// Which CALL variant issued the request.
    pub kind: CallKind,
    /// CALLER inside the new frame.
    pub caller: Address,
    /// Storage and balance context (ADDRESS inside the new frame).
    pub address: Address,
    /// Account whose code runs.
    pub code_address: Address,
    /// CALLVALUE inside the new frame.
    pub value: U256,
    /// Whether `value` moves from `caller` to `address`.
    pub transfers_value: bool,
    /// Calldata.
    pub input: Bytes,
    /// Gas handed to the callee, stipend included.
    pub gas_limit: u64,
    /// Read-only frame.
    pub is_static: bool,
}

/// Address derivation scheme for a creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateScheme {
    /// keccak(rlp(sender, nonce)).
    Create,
    /// keccak(0xff ++ sender ++ salt ++ keccak(init)).
    Create2 {
        /// User-provided salt.
        salt: U256,
    },
}

/// Request to deploy a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateInput {
    /// Address derivation.
    pub scheme: CreateScheme,
    /// Creator.
    pub caller: Address,
    /// Endowment.
    pub value: U256,
    /// Init code.
    pub init_code: Bytes,
    /// Gas handed to the init frame.
    pub gas_limit: u64,
}

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of a nested call or create, as seen by the parent frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    /// Frame returned normally.
    pub success: bool,
    /// Gas handed back to the caller.
    pub gas_left: u64,
    /// Refund counter accumulated by the callee (zero unless `success`).
    pub gas_refund: i64,
    /// RETURN or REVERT payload.
    pub output: Bytes,
    /// Deployed address for successful creations.
    pub created_address: Option<Address>,
    /// Halt reason; `None` for success and explicit REVERT.
    pub error: Option<VmError>,
}

impl CallResult {
    /// Successful result.
    #[must_use]
    pub fn success(gas_left: u64, gas_refund: i64, output: Bytes) -> Self {
        Self {
            success: true,
            gas_left,
            gas_refund,
            output,
            created_address: None,
            error: None,
        }
    }

    /// REVERT: unused gas and the payload go back to the caller.
    #[must_use]
    pub fn revert(gas_left: u64, output: Bytes) -> Self {
        Self {
            success: false,
            gas_left,
            gas_refund: 0,
            output,
            created_address: None,
            error: None,
        }
    }

    /// Exceptional halt. Gas is forfeited unless the error fails the call
    /// before its frame started.
    #[must_use]
    pub fn halt(error: VmError, gas_limit: u64) -> Self {
        let gas_left = if error.consumes_all_gas() { 0 } else { gas_limit };
        Self {
            success: false,
            gas_left,
            gas_refund: 0,
            output: Bytes::new(),
            created_address: None,
            error: Some(error),
        }
    }

    /// Returns true for an explicit REVERT.
    #[must_use]
    pub fn is_revert(&self) -> bool {
        !self.success && self.error.is_none()
    }
}

/// Final status of a top-level execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// STOP, RETURN, SELFDESTRUCT or end of code.
    Success,
    /// REVERT.
    Revert,
    /// Exceptional halt.
    Halt,
}

/// Result of a transaction or top-level message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Final status.
    pub status: ExecutionStatus,
    /// Gas charged after the refund.
    pub gas_used: u64,
    /// Refund applied (already subtracted from `gas_used`).
    pub gas_refunded: u64,
    /// Return data, or the revert payload.
    pub output: Bytes,
    /// Logs of the successful execution; empty otherwise.
    pub logs: Vec<Log>,
    /// Deployed contract for creations.
    pub created_address: Option<Address>,
    /// Decoded `Error(string)` payload on revert.
    pub revert_reason: Option<String>,
    /// Halt reason.
    pub error: Option<VmError>,
}

impl ExecutionResult {
    /// Returns true if execution succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Decodes a Solidity `Error(string)` revert payload.
#[must_use]
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    // Error(string) selector: 0x08c379a0
    if data.len() < 68 || data[0..4] != [0x08, 0xc3, 0x79, 0xa0] {
        return None;
    }

    // selector (4) + offset word (32), then the length word
    let offset = 4 + 32;
    let len = U256::from_big_endian(&data[offset..offset + 32]);
    let available = data.len() - (offset + 32);
    if len > U256::from(available) {
        return None;
    }
    let len = len.as_usize();
    String::from_utf8(data[offset + 32..offset + 32 + len].to_vec()).ok()
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Emitted log (event) from contract execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
