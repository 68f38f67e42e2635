//! # Access Tracker (EIP-2929)
//!
//! Per-transaction warm sets for accounts and storage slots. The first touch
//! of an address or slot pays the cold price; every later touch in the same
//! transaction is warm. Sets only grow until [`AccessTracker::clear`].

use crate::domain::value_objects::{Address, U256};
use crate::evm::gas::GasSchedule;
use std::collections::HashSet;

/// Warm/cold access tracking.
#[derive(Clone, Debug)]
pub struct AccessTracker {
    warm_accounts: HashSet<Address>,
    warm_slots: HashSet<(Address, U256)>,
    cold_account_cost: u64,
    cold_slot_cost: u64,
    warm_cost: u64,
}

impl AccessTracker {
    /// Tracker pricing accesses with `schedule`.
    #[must_use]
    pub fn new(schedule: &GasSchedule) -> Self {
        Self {
            warm_accounts: HashSet::new(),
            warm_slots: HashSet::new(),
            cold_account_cost: schedule.cold_account_access,
            cold_slot_cost: schedule.cold_sload,
            warm_cost: schedule.warm_access,
        }
    }

    /// Touches `address`, returning its access cost (cold on first touch).
    pub fn access_address(&mut self, address: Address) -> u64 {
        if self.warm_accounts.insert(address) {
            self.cold_account_cost
        } else {
            self.warm_cost
        }
    }

    /// Touches `(address, key)`, returning its access cost.
    pub fn access_slot(&mut self, address: Address, key: U256) -> u64 {
        if self.warm_slots.insert((address, key)) {
            self.cold_slot_cost
        } else {
            self.warm_cost
        }
    }

    /// Marks `address` warm without charging (transaction pre-warming).
    pub fn warm_address(&mut self, address: Address) {
        self.warm_accounts.insert(address);
    }

    /// Marks a slot warm without charging (EIP-2930 access lists).
    pub fn warm_slot(&mut self, address: Address, key: U256) {
        self.warm_slots.insert((address, key));
    }

    /// Returns true if `address` was touched in this transaction.
    #[must_use]
    pub fn is_address_warm(&self, address: &Address) -> bool {
        self.warm_accounts.contains(address)
    }

    /// Returns true if the slot was touched in this transaction.
    #[must_use]
    pub fn is_slot_warm(&self, address: &Address, key: U256) -> bool {
        self.warm_slots.contains(&(*address, key))
    }

    /// Forgets everything; called between transactions.
    pub fn clear(&mut self) {
        self.warm_accounts.clear();
        self.warm_slots.clear();
    }
}

impl Default for AccessTracker {
    fn default() -> Self {
        Self::new(&GasSchedule::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
