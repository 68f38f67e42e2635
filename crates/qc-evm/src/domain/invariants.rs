//! # Domain Invariants
//!
//! Post-execution checks the executor runs on its own output. A failed check
//! means host-level corruption (bad depth bookkeeping, a refund that was not
//! capped, a static frame that wrote state) and is reported as
//! [`VmError::Internal`](crate::errors::VmError::Internal), never as a
//! contract-level failure.
//!
//! - Gas accounting: a transaction never charges more than its limit, and
//!   the refund never exceeds the fork's cap.
//! - Revert rollback: failed executions carry no logs.
//! - Static purity: a read-only execution leaves nothing in the journal
//!   except implicit account touches.
//! - Call depth: the frame counter never passes [`limits::MAX_CALL_DEPTH`].

use crate::domain::entities::ExecutionResult;
use crate::evm::gas::GasSchedule;
use crate::evm::state::JournalEntry;
use std::fmt;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Gas used after refund stays within the limit.
#[must_use]
pub fn check_gas_limit(result: &ExecutionResult, gas_limit: u64) -> bool {
    result.gas_used <= gas_limit
}

/// The refund paid out respects `used / max_refund_quotient`.
#[must_use]
pub fn check_refund_cap(result: &ExecutionResult, schedule: &GasSchedule) -> bool {
    let used_before_refund = result.gas_used.saturating_add(result.gas_refunded);
    result.gas_refunded <= used_before_refund / schedule.max_refund_quotient.max(1)
}

/// Failed executions report no logs and no refund.
#[must_use]
pub fn check_revert_rollback(result: &ExecutionResult) -> bool {
    result.is_success() || (result.logs.is_empty() && result.gas_refunded == 0)
}

/// Journal entries recorded by a read-only execution.
///
/// Only implicit account creation (a zero-value touch) is allowed.
#[must_use]
pub fn check_static_purity(journal: &[JournalEntry]) -> bool {
    journal
        .iter()
        .all(|entry| matches!(entry, JournalEntry::AccountCreated { .. }))
}

/// The active frame count is within bounds.
#[must_use]
pub fn check_call_depth(depth: usize) -> bool {
    depth <= limits::MAX_CALL_DEPTH
}

/// Runs every result-level check.
#[must_use]
pub fn check_all_invariants(
    result: &ExecutionResult,
    gas_limit: u64,
    schedule: &GasSchedule,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_gas_limit(result, gas_limit) {
        violations.push(InvariantViolation::GasLimitExceeded {
            used: result.gas_used,
            limit: gas_limit,
        });
    }

    if !check_refund_cap(result, schedule) {
        violations.push(InvariantViolation::RefundNotCapped {
            refunded: result.gas_refunded,
            used: result.gas_used,
        });
    }

    if !check_revert_rollback(result) {
        violations.push(InvariantViolation::StateNotRolledBack {
            logs: result.logs.len(),
        });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Gas used exceeds the limit.
    GasLimitExceeded { used: u64, limit: u64 },
    /// Refund above the fork's cap.
    RefundNotCapped { refunded: u64, used: u64 },
    /// Failed execution still carries side effects.
    StateNotRolledBack { logs: usize },
    /// Read-only execution wrote state.
    StaticCallViolation { writes: usize },
    /// Frame counter out of range.
    CallDepthExceeded { depth: usize, max: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GasLimitExceeded { used, limit } => {
                write!(f, "gas limit exceeded: used {used} > limit {limit}")
            }
            Self::RefundNotCapped { refunded, used } => {
                write!(f, "refund {refunded} above cap for {used} gas used")
            }
            Self::StateNotRolledBack { logs } => {
                write!(f, "failed execution kept {logs} logs")
            }
            Self::StaticCallViolation { writes } => {
                write!(f, "read-only execution recorded {writes} state writes")
            }
            Self::CallDepthExceeded { depth, max } => {
                write!(f, "call depth exceeded: {depth} > {max}")
            }
        }
    }
}

// =============================================================================
// EXECUTION LIMIT CONSTANTS
// =============================================================================

/// Protocol limits.
pub mod limits {
    /// Maximum call depth.
    pub const MAX_CALL_DEPTH: usize = 1024;

    /// Maximum deployed code size in bytes (EIP-170).
    pub const MAX_CODE_SIZE: usize = 24_576;

    /// Maximum init code size in bytes (EIP-3860).
    pub const MAX_INIT_CODE_SIZE: usize = 49_152;
}

// =============================================================================
// TESTS
// =============================================================================
