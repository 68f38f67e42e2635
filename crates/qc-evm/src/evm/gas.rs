//! # EVM Gas Metering
//!
//! Fork-indexed gas schedule, the per-frame gas meter and the dynamic cost
//! formulas. Formulas only *compute* a cost; the frame charges it.
//!
//! ## Refund accounting
//!
//! The refund counter is signed and never clamped while executing: SSTORE may
//! take back a refund it granted earlier in the transaction. Only
//! [`capped_refund`] at transaction end clamps it to `[0, used / quotient]`.

use crate::domain::entities::AccessListItem;
use crate::domain::hardfork::Hardfork;
use crate::domain::value_objects::U256;
use crate::errors::VmError;
use serde::{Deserialize, Serialize};

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Fixed costs shared by every fork.
pub mod costs {
    /// Zero gas.
    pub const ZERO: u64 = 0;
    /// Base cost (e.g., for `ADDRESS`).
    pub const BASE: u64 = 2;
    /// Very low cost (e.g., for `ADD`).
    pub const VERY_LOW: u64 = 3;
    /// Low cost (e.g., for `MUL`).
    pub const LOW: u64 = 5;
    /// Mid cost.
    pub const MID: u64 = 8;
    /// High cost.
    pub const HIGH: u64 = 10;
    /// Jump destination cost.
    pub const JUMPDEST: u64 = 1;
    /// BLOCKHASH cost.
    pub const BLOCKHASH: u64 = 20;

    /// Gas per word for memory copy.
    pub const COPY: u64 = 3;

    /// KECCAK256 base cost.
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 (and CREATE2 hashing) cost per word.
    pub const KECCAK256_WORD: u64 = 6;

    /// EXP base cost.
    pub const EXP: u64 = 10;

    /// LOG base cost.
    pub const LOG: u64 = 375;
    /// LOG cost per topic.
    pub const LOG_TOPIC: u64 = 375;
    /// LOG cost per byte of data.
    pub const LOG_DATA: u64 = 8;

    /// Cost for value transfer.
    pub const CALL_VALUE: u64 = 9000;
    /// Cost for creating a new account.
    pub const NEW_ACCOUNT: u64 = 25_000;
    /// Stipend given to the callee when value > 0.
    pub const CALL_STIPEND: u64 = 2300;

    /// CREATE/CREATE2 base cost.
    pub const CREATE: u64 = 32_000;
    /// Deposit cost per byte of returned code.
    pub const CODE_DEPOSIT: u64 = 200;

    /// SSTORE sentry (EIP-2200).
    pub const SSTORE_SENTRY: u64 = 2300;
    /// SSTORE zero to non-zero.
    pub const SSTORE_SET: u64 = 20_000;

    /// Base transaction gas.
    pub const TX_BASE: u64 = 21_000;
    /// Gas per zero byte of calldata.
    pub const TX_DATA_ZERO: u64 = 4;
    /// Access list cost per address (EIP-2930).
    pub const ACCESS_LIST_ADDRESS: u64 = 2400;
    /// Access list cost per storage key (EIP-2930).
    pub const ACCESS_LIST_STORAGE_KEY: u64 = 1900;
}

// =============================================================================
// GAS SCHEDULE
// =============================================================================

/// Fork-dependent prices.
///
/// Built with [`GasSchedule::for_hardfork`]; individual prices may be
/// replaced through a [`GasScheduleOverride`] in
/// [`EvmConfig`](crate::config::EvmConfig).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasSchedule {
    /// BALANCE before EIP-2929.
    pub balance: u64,
    /// SLOAD before EIP-2929; the warm storage read price from Berlin on.
    pub sload: u64,
    /// EXTCODESIZE / EXTCODECOPY before EIP-2929.
    pub ext_code: u64,
    /// EXTCODEHASH before EIP-2929.
    pub ext_code_hash: u64,
    /// CALL family base cost before EIP-2929.
    pub call: u64,
    /// SELFDESTRUCT base cost.
    pub selfdestruct: u64,
    /// EXP cost per exponent byte.
    pub exp_byte: u64,
    /// First access to an account (EIP-2929).
    pub cold_account_access: u64,
    /// First access to a storage slot (EIP-2929).
    pub cold_sload: u64,
    /// Any later access, and TLOAD/TSTORE.
    pub warm_access: u64,
    /// SSTORE on a clean, non-zero slot (cold surcharge excluded).
    pub sstore_reset: u64,
    /// Refund for clearing a slot.
    pub sstore_clear_refund: i64,
    /// Refund for the first SELFDESTRUCT of an account.
    pub selfdestruct_refund: i64,
    /// Init code cost per word (EIP-3860).
    pub initcode_word: u64,
    /// Calldata cost per non-zero byte.
    pub tx_data_non_zero: u64,
    /// Extra intrinsic gas for creation transactions.
    pub tx_create: u64,
    /// Final refund cap divisor (`used / quotient`).
    pub max_refund_quotient: u64,
}

impl GasSchedule {
    /// Prices in force at `fork`.
    #[must_use]
    pub fn for_hardfork(fork: Hardfork) -> Self {
        let tangerine = fork.is_enabled_in(Hardfork::TangerineWhistle);
        let istanbul = fork.is_enabled_in(Hardfork::Istanbul);
        let berlin = fork.has_access_lists();
        let london = fork.has_reduced_refunds();

        let warm_access = 100;
        let (balance, sload, ext_code_hash) = if berlin {
            (warm_access, warm_access, warm_access)
        } else if istanbul {
            (700, 800, 700)
        } else if tangerine {
            (400, 200, 400)
        } else {
            (20, 50, 400)
        };
        let (ext_code, call) = match (berlin, tangerine) {
            (true, _) => (warm_access, warm_access),
            (false, true) => (700, 700),
            (false, false) => (20, 40),
        };

        Self {
            balance,
            sload,
            ext_code,
            ext_code_hash,
            call,
            selfdestruct: if tangerine { 5000 } else { 0 },
            exp_byte: if fork.is_enabled_in(Hardfork::SpuriousDragon) { 50 } else { 10 },
            cold_account_access: 2600,
            cold_sload: 2100,
            warm_access,
            sstore_reset: if berlin { 5000 - 2100 } else { 5000 },
            sstore_clear_refund: if london { 4800 } else { 15_000 },
            selfdestruct_refund: if london { 0 } else { 24_000 },
            initcode_word: if fork.is_enabled_in(Hardfork::Shanghai) { 2 } else { 0 },
            tx_data_non_zero: if istanbul { 16 } else { 68 },
            tx_create: if fork.is_enabled_in(Hardfork::Homestead) { costs::CREATE } else { 0 },
            max_refund_quotient: if london { 5 } else { 2 },
        }
    }
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self::for_hardfork(Hardfork::default())
    }
}

/// Partial schedule. Set fields replace the price of whatever fork the
/// override is applied to; unset fields keep that fork's price.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasScheduleOverride {
    /// See [`GasSchedule::balance`].
    pub balance: Option<u64>,
    /// See [`GasSchedule::sload`].
    pub sload: Option<u64>,
    /// See [`GasSchedule::ext_code`].
    pub ext_code: Option<u64>,
    /// See [`GasSchedule::ext_code_hash`].
    pub ext_code_hash: Option<u64>,
    /// See [`GasSchedule::call`].
    pub call: Option<u64>,
    /// See [`GasSchedule::selfdestruct`].
    pub selfdestruct: Option<u64>,
    /// See [`GasSchedule::exp_byte`].
    pub exp_byte: Option<u64>,
    /// See [`GasSchedule::cold_account_access`].
    pub cold_account_access: Option<u64>,
    /// See [`GasSchedule::cold_sload`].
    pub cold_sload: Option<u64>,
    /// See [`GasSchedule::warm_access`].
    pub warm_access: Option<u64>,
    /// See [`GasSchedule::sstore_reset`].
    pub sstore_reset: Option<u64>,
    /// See [`GasSchedule::sstore_clear_refund`].
    pub sstore_clear_refund: Option<i64>,
    /// See [`GasSchedule::selfdestruct_refund`].
    pub selfdestruct_refund: Option<i64>,
    /// See [`GasSchedule::initcode_word`].
    pub initcode_word: Option<u64>,
    /// See [`GasSchedule::tx_data_non_zero`].
    pub tx_data_non_zero: Option<u64>,
    /// See [`GasSchedule::tx_create`].
    pub tx_create: Option<u64>,
    /// See [`GasSchedule::max_refund_quotient`].
    pub max_refund_quotient: Option<u64>,
}

impl GasScheduleOverride {
    /// `base` with every set field replaced.
    #[must_use]
    pub fn apply(&self, mut base: GasSchedule) -> GasSchedule {
        macro_rules! replace {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(price) = self.$field {
                        base.$field = price;
                    }
                )*
            };
        }
        replace!(
            balance,
            sload,
            ext_code,
            ext_code_hash,
            call,
            selfdestruct,
            exp_byte,
            cold_account_access,
            cold_sload,
            warm_access,
            sstore_reset,
            sstore_clear_refund,
            selfdestruct_refund,
            initcode_word,
            tx_data_non_zero,
            tx_create,
            max_refund_quotient,
        );
        base
    }
}

impl From<GasSchedule> for GasScheduleOverride {
    fn from(schedule: GasSchedule) -> Self {
        let GasSchedule {
            balance,
            sload,
            ext_code,
            ext_code_hash,
            call,
            selfdestruct,
            exp_byte,
            cold_account_access,
            cold_sload,
            warm_access,
            sstore_reset,
            sstore_clear_refund,
            selfdestruct_refund,
            initcode_word,
            tx_data_non_zero,
            tx_create,
            max_refund_quotient,
        } = schedule;
        Self {
            balance: Some(balance),
            sload: Some(sload),
            ext_code: Some(ext_code),
            ext_code_hash: Some(ext_code_hash),
            call: Some(call),
            selfdestruct: Some(selfdestruct),
            exp_byte: Some(exp_byte),
            cold_account_access: Some(cold_account_access),
            cold_sload: Some(cold_sload),
            warm_access: Some(warm_access),
            sstore_reset: Some(sstore_reset),
            sstore_clear_refund: Some(sstore_clear_refund),
            selfdestruct_refund: Some(selfdestruct_refund),
            initcode_word: Some(initcode_word),
            tx_data_non_zero: Some(tx_data_non_zero),
            tx_create: Some(tx_create),
            max_refund_quotient: Some(max_refund_quotient),
        }
    }
}

// =============================================================================
// GAS METER
// =============================================================================

/// Gas accounting for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    remaining: u64,
    refund: i64,
}

impl GasMeter {
    /// Meter with `limit` gas available.
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refund: 0,
        }
    }

    /// Gas handed to the frame.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas still available.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas consumed so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Signed refund counter.
    #[must_use]
    pub fn refund(&self) -> i64 {
        self.refund
    }

    /// Deducts `cost`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` (leaving the meter untouched) if `cost` exceeds the
    /// remaining gas.
    pub fn charge(&mut self, cost: u64) -> Result<(), VmError> {
        if cost > self.remaining {
            return Err(VmError::OutOfGas);
        }
        self.remaining -= cost;
        Ok(())
    }

    /// Returns gas a child frame did not consume.
    pub fn credit(&mut self, gas: u64) {
        self.remaining = self.remaining.saturating_add(gas).min(self.limit);
    }

    /// Adjusts the refund counter.
    pub fn record_refund(&mut self, delta: i64) {
        self.refund += delta;
    }

    /// Forfeits all remaining gas.
    pub fn spend_all(&mut self) {
        self.remaining = 0;
    }
}

// =============================================================================
// DYNAMIC COSTS
// =============================================================================

fn words(bytes: usize) -> u64 {
    bytes.div_ceil(32) as u64
}

/// Dynamic part of EXP: per-byte cost of the exponent.
#[must_use]
pub fn exp_dynamic_cost(schedule: &GasSchedule, exponent: U256) -> u64 {
    let byte_size = u64::from(256 - exponent.leading_zeros()).div_ceil(8);
    schedule.exp_byte * byte_size
}

/// Dynamic part of KECCAK256.
#[must_use]
pub fn keccak256_dynamic_cost(data_size: usize) -> u64 {
    costs::KECCAK256_WORD * words(data_size)
}

/// Dynamic part of LOGn.
#[must_use]
pub fn log_dynamic_cost(data_size: usize, topic_count: usize) -> u64 {
    costs::LOG_TOPIC * topic_count as u64 + costs::LOG_DATA * data_size as u64
}

/// Word copy cost for CALLDATACOPY, CODECOPY, MCOPY and friends.
#[must_use]
pub fn copy_cost(size: usize) -> u64 {
    costs::COPY * words(size)
}

/// Dynamic part of CREATE/CREATE2: EIP-3860 init code words plus, for
/// CREATE2, hashing the init code.
#[must_use]
pub fn create_dynamic_cost(schedule: &GasSchedule, init_code_size: usize, is_create2: bool) -> u64 {
    let words = words(init_code_size);
    let hash = if is_create2 { costs::KECCAK256_WORD * words } else { 0 };
    schedule.initcode_word * words + hash
}

/// Value-transfer and new-account surcharges for the CALL family.
#[must_use]
pub fn call_extra_cost(transfers_value: bool, creates_account: bool) -> u64 {
    let mut gas = 0;
    if transfers_value {
        gas += costs::CALL_VALUE;
    }
    if creates_account {
        gas += costs::NEW_ACCOUNT;
    }
    gas
}

/// Gas passed to a CALL-family callee, before the stipend.
///
/// From Tangerine Whistle the request is capped at all but one 64th of the
/// remaining gas; before it, asking for more than is left is out of gas.
///
/// # Errors
///
/// Returns `OutOfGas` pre-EIP-150 when `requested` exceeds `remaining`.
pub fn forwarded_call_gas(fork: Hardfork, remaining: u64, requested: U256) -> Result<u64, VmError> {
    let requested = u64::try_from(requested).unwrap_or(u64::MAX);
    if fork.has_call_gas_cap() {
        Ok(requested.min(remaining - remaining / 64))
    } else if requested > remaining {
        Err(VmError::OutOfGas)
    } else {
        Ok(requested)
    }
}

/// Gas passed to CREATE/CREATE2 init code.
#[must_use]
pub fn forwarded_create_gas(fork: Hardfork, remaining: u64) -> u64 {
    if fork.has_call_gas_cap() {
        remaining - remaining / 64
    } else {
        remaining
    }
}

/// SELFDESTRUCT surcharge for funding a fresh beneficiary.
///
/// Pre-Spurious the charge applies to any non-existent beneficiary (from
/// Tangerine); afterwards only when value moves into an empty account.
#[must_use]
pub fn selfdestruct_extra_cost(
    fork: Hardfork,
    beneficiary_exists: bool,
    beneficiary_empty: bool,
    balance: U256,
) -> u64 {
    let charge = if fork.has_empty_account_semantics() {
        beneficiary_empty && !balance.is_zero()
    } else {
        fork.has_call_gas_cap() && !beneficiary_exists
    };
    if charge {
        costs::NEW_ACCOUNT
    } else {
        0
    }
}

/// Slot values seen by one SSTORE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SstoreValues {
    /// Value at transaction start.
    pub original: U256,
    /// Value before this write.
    pub current: U256,
    /// Value being written.
    pub new: U256,
}

/// SSTORE gas. Includes the EIP-2929 cold surcharge when `is_cold` on Berlin+.
#[must_use]
pub fn sstore_cost(schedule: &GasSchedule, fork: Hardfork, v: SstoreValues, is_cold: bool) -> u64 {
    if !fork.has_net_sstore_metering() {
        return if v.current.is_zero() && !v.new.is_zero() {
            costs::SSTORE_SET
        } else {
            schedule.sstore_reset
        };
    }

    let cold = if is_cold && fork.has_access_lists() { schedule.cold_sload } else { 0 };
    let base = if v.new == v.current {
        schedule.sload
    } else if v.original == v.current {
        if v.original.is_zero() {
            costs::SSTORE_SET
        } else {
            schedule.sstore_reset
        }
    } else {
        schedule.sload
    };
    cold + base
}

/// SSTORE refund delta (may be negative).
#[must_use]
pub fn sstore_refund(schedule: &GasSchedule, fork: Hardfork, v: SstoreValues) -> i64 {
    let clear = schedule.sstore_clear_refund;

    if !fork.has_net_sstore_metering() {
        return if !v.current.is_zero() && v.new.is_zero() { clear } else { 0 };
    }

    if v.new == v.current {
        return 0;
    }
    if v.original == v.current {
        return if v.new.is_zero() { clear } else { 0 };
    }

    let mut refund = 0;
    if !v.original.is_zero() {
        if v.current.is_zero() {
            refund -= clear;
        } else if v.new.is_zero() {
            refund += clear;
        }
    }
    if v.original == v.new {
        let paid = if v.original.is_zero() { costs::SSTORE_SET } else { schedule.sstore_reset };
        refund += i64::try_from(paid - schedule.sload).unwrap_or(0);
    }
    refund
}

/// Refund actually paid out at transaction end.
#[must_use]
pub fn capped_refund(schedule: &GasSchedule, gas_used: u64, refund: i64) -> u64 {
    let refund = u64::try_from(refund).unwrap_or(0);
    refund.min(gas_used / schedule.max_refund_quotient.max(1))
}

/// Gas charged before the first opcode of a transaction runs.
#[must_use]
pub fn intrinsic_gas(
    schedule: &GasSchedule,
    data: &[u8],
    is_create: bool,
    access_list: &[AccessListItem],
) -> u64 {
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;

    let mut gas = costs::TX_BASE
        + zeros * costs::TX_DATA_ZERO
        + non_zeros * schedule.tx_data_non_zero;
    if is_create {
        gas += schedule.tx_create + schedule.initcode_word * words(data.len());
    }
    for item in access_list {
        gas += costs::ACCESS_LIST_ADDRESS
            + costs::ACCESS_LIST_STORAGE_KEY * item.storage_keys.len() as u64;
    }
    gas
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn values(original: u64, current: u64, new: u64) -> SstoreValues {
        SstoreValues {
            original: U256::from(original),
            current: U256::from(current),
            new: U256::from(new),
        }
    }

    #[test]
    fn test_schedule_by_fork() {
        let frontier = GasSchedule::for_hardfork(Hardfork::Frontier);
        assert_eq!(frontier.sload, 50);
        assert_eq!(frontier.call, 40);
        assert_eq!(frontier.exp_byte, 10);
        assert_eq!(frontier.tx_create, 0);

        let istanbul = GasSchedule::for_hardfork(Hardfork::Istanbul);
        assert_eq!(istanbul.sload, 800);
        assert_eq!(istanbul.balance, 700);
        assert_eq!(istanbul.tx_data_non_zero, 16);

        let berlin = GasSchedule::for_hardfork(Hardfork::Berlin);
        assert_eq!(berlin.sstore_reset, 2900);
        assert_eq!(berlin.sstore_clear_refund, 15_000);

        let london = GasSchedule::for_hardfork(Hardfork::London);
        assert_eq!(london.sstore_clear_refund, 4800);
        assert_eq!(london.selfdestruct_refund, 0);
        assert_eq!(london.max_refund_quotient, 5);

        assert_eq!(GasSchedule::default(), GasSchedule::for_hardfork(Hardfork::Cancun));
    }

    #[test]
    fn test_override_keeps_base_fork_prices() {
        let berlin = GasSchedule::for_hardfork(Hardfork::Berlin);
        let partial = GasScheduleOverride {
            sload: Some(7),
            ..GasScheduleOverride::default()
        };

        let schedule = partial.apply(berlin.clone());
        assert_eq!(schedule.sload, 7);
        assert_eq!(schedule.max_refund_quotient, 2);
        assert_eq!(schedule.sstore_clear_refund, 15_000);
        assert_eq!(schedule.initcode_word, 0);
        assert_eq!(GasScheduleOverride::default().apply(berlin.clone()), berlin);

        let london = GasSchedule::for_hardfork(Hardfork::London);
        assert_eq!(GasScheduleOverride::from(london.clone()).apply(berlin), london);
    }

    #[test]
    fn test_meter_charge_and_credit() {
        let mut meter = GasMeter::new(100);
        meter.charge(30).unwrap();
        assert_eq!(meter.remaining(), 70);
        assert_eq!(meter.used(), 30);

        assert_eq!(meter.charge(71), Err(VmError::OutOfGas));
        assert_eq!(meter.remaining(), 70);

        meter.credit(20);
        assert_eq!(meter.remaining(), 90);

        meter.record_refund(10);
        meter.record_refund(-25);
        assert_eq!(meter.refund(), -15);

        meter.spend_all();
        assert_eq!(meter.used(), 100);
    }

    #[test]
    fn test_exp_cost() {
        let spurious = GasSchedule::for_hardfork(Hardfork::SpuriousDragon);
        assert_eq!(exp_dynamic_cost(&spurious, U256::zero()), 0);
        assert_eq!(exp_dynamic_cost(&spurious, U256::from(255)), 50);
        assert_eq!(exp_dynamic_cost(&spurious, U256::from(256)), 100);
        assert_eq!(exp_dynamic_cost(&spurious, U256::MAX), 1600);

        let frontier = GasSchedule::for_hardfork(Hardfork::Frontier);
        assert_eq!(exp_dynamic_cost(&frontier, U256::from(256)), 20);
    }

    #[test]
    fn test_word_costs() {
        assert_eq!(copy_cost(0), 0);
        assert_eq!(copy_cost(33), 6);
        assert_eq!(keccak256_dynamic_cost(64), 12);
        assert_eq!(log_dynamic_cost(64, 2), 750 + 512);

        let shanghai = GasSchedule::for_hardfork(Hardfork::Shanghai);
        assert_eq!(create_dynamic_cost(&shanghai, 64, false), 4);
        assert_eq!(create_dynamic_cost(&shanghai, 64, true), 16);
        let london = GasSchedule::for_hardfork(Hardfork::London);
        assert_eq!(create_dynamic_cost(&london, 64, false), 0);
    }

    #[test]
    fn test_forwarded_call_gas() {
        let remaining = 64_000;
        let gas = forwarded_call_gas(Hardfork::Cancun, remaining, U256::MAX).unwrap();
        assert_eq!(gas, 63_000);
        assert_eq!(forwarded_call_gas(Hardfork::Cancun, remaining, U256::from(10)).unwrap(), 10);

        assert_eq!(
            forwarded_call_gas(Hardfork::Homestead, remaining, U256::from(64_001)),
            Err(VmError::OutOfGas)
        );
        assert_eq!(forwarded_call_gas(Hardfork::Homestead, remaining, U256::from(64_000)).unwrap(), 64_000);

        assert_eq!(forwarded_create_gas(Hardfork::Cancun, 6400), 6300);
        assert_eq!(forwarded_create_gas(Hardfork::Frontier, 6400), 6400);
    }

    #[test]
    fn test_call_extra_cost() {
        assert_eq!(call_extra_cost(false, false), 0);
        assert_eq!(call_extra_cost(true, false), 9000);
        assert_eq!(call_extra_cost(true, true), 34_000);
    }

    #[test]
    fn test_selfdestruct_extra_cost() {
        let one = U256::one();
        assert_eq!(selfdestruct_extra_cost(Hardfork::Cancun, true, true, one), 25_000);
        assert_eq!(selfdestruct_extra_cost(Hardfork::Cancun, false, true, U256::zero()), 0);
        assert_eq!(selfdestruct_extra_cost(Hardfork::TangerineWhistle, false, true, U256::zero()), 25_000);
        assert_eq!(selfdestruct_extra_cost(Hardfork::Frontier, false, true, one), 0);
    }

    #[test]
    fn test_sstore_cost_berlin() {
        let s = GasSchedule::for_hardfork(Hardfork::Berlin);
        let fork = Hardfork::Berlin;
        // Fresh slot set
        assert_eq!(sstore_cost(&s, fork, values(0, 0, 1), true), 22_100);
        // Clean non-zero slot changed
        assert_eq!(sstore_cost(&s, fork, values(1, 1, 2), false), 2900);
        // No-op write
        assert_eq!(sstore_cost(&s, fork, values(1, 1, 1), false), 100);
        // Dirty slot
        assert_eq!(sstore_cost(&s, fork, values(1, 2, 3), false), 100);
    }

    #[test]
    fn test_sstore_cost_legacy() {
        let s = GasSchedule::for_hardfork(Hardfork::Petersburg);
        assert_eq!(sstore_cost(&s, Hardfork::Petersburg, values(0, 0, 1), false), 20_000);
        assert_eq!(sstore_cost(&s, Hardfork::Petersburg, values(0, 1, 0), false), 5000);
        assert_eq!(sstore_refund(&s, Hardfork::Petersburg, values(0, 1, 0)), 15_000);

        let s = GasSchedule::for_hardfork(Hardfork::Istanbul);
        assert_eq!(sstore_cost(&s, Hardfork::Istanbul, values(1, 1, 2), true), 5000);
        assert_eq!(sstore_cost(&s, Hardfork::Istanbul, values(1, 2, 3), true), 800);
    }

    #[test]
    fn test_sstore_refund_restores_original() {
        let s = GasSchedule::for_hardfork(Hardfork::London);
        let fork = Hardfork::London;

        // V -> 0 -> V: the clear refund is granted then taken back
        let first = sstore_refund(&s, fork, values(5, 5, 0));
        let second = sstore_refund(&s, fork, values(5, 0, 5));
        assert_eq!(first, 4800);
        assert_eq!(first + second, 2900 - 100);

        // 0 -> V -> 0: everything but a warm read comes back
        let first = sstore_refund(&s, fork, values(0, 0, 5));
        let second = sstore_refund(&s, fork, values(0, 5, 0));
        assert_eq!(first, 0);
        assert_eq!(second, 20_000 - 100);
    }

    #[test]
    fn test_capped_refund() {
        let berlin = GasSchedule::for_hardfork(Hardfork::Berlin);
        assert_eq!(capped_refund(&berlin, 1000, 600), 500);
        assert_eq!(capped_refund(&berlin, 1000, 400), 400);
        assert_eq!(capped_refund(&berlin, 1000, -50), 0);

        let london = GasSchedule::for_hardfork(Hardfork::London);
        assert_eq!(capped_refund(&london, 1000, 600), 200);
    }

    #[test]
    fn test_intrinsic_gas() {
        let s = GasSchedule::for_hardfork(Hardfork::Cancun);
        assert_eq!(intrinsic_gas(&s, &[], false, &[]), 21_000);
        assert_eq!(intrinsic_gas(&s, &[0, 1, 0], false, &[]), 21_000 + 8 + 16);

        let list = vec![AccessListItem {
            address: crate::domain::value_objects::Address::ZERO,
            storage_keys: vec![U256::one(), U256::from(2)],
        }];
        assert_eq!(intrinsic_gas(&s, &[], false, &list), 21_000 + 2400 + 3800);

        // 33 bytes of init code: 2 words
        assert_eq!(intrinsic_gas(&s, &[0u8; 33], true, &[]), 21_000 + 33 * 4 + 32_000 + 4);

        let frontier = GasSchedule::for_hardfork(Hardfork::Frontier);
        assert_eq!(intrinsic_gas(&frontier, &[1], true, &[]), 21_000 + 68);
    }
}
