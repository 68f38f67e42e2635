//! # Transient Storage (EIP-1153)
//!
//! Backing map for TLOAD and TSTORE. Lives for one transaction; rollback of
//! reverted frames is driven by the world-state journal.

use crate::domain::value_objects::{Address, U256};
use std::collections::HashMap;

/// Transient storage for a single transaction.
#[derive(Debug, Default, Clone)]
pub struct TransientStorage {
    data: HashMap<(Address, U256), U256>,
}

impl TransientStorage {
    /// Creates a new empty transient storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// TLOAD. Unset slots read as zero.
    #[must_use]
    pub fn get(&self, address: &Address, key: U256) -> U256 {
        self.data.get(&(*address, key)).copied().unwrap_or_default()
    }

    /// TSTORE. Returns the previous value for journaling.
    pub fn set(&mut self, address: Address, key: U256, value: U256) -> U256 {
        let previous = if value.is_zero() {
            self.data.remove(&(address, key))
        } else {
            self.data.insert((address, key), value)
        };
        previous.unwrap_or_default()
    }

    /// Clear everything (end of transaction).
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Number of non-zero slots across all contracts.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_reads_zero() {
        let storage = TransientStorage::new();
        assert_eq!(storage.get(&Address::from_low_u64(1), U256::one()), U256::zero());
    }

    #[test]
    fn test_set_returns_previous() {
        let mut storage = TransientStorage::new();
        let addr = Address::from_low_u64(0x1234);

        assert_eq!(storage.set(addr, U256::one(), U256::from(42)), U256::zero());
        assert_eq!(storage.set(addr, U256::one(), U256::from(43)), U256::from(42));
        assert_eq!(storage.get(&addr, U256::one()), U256::from(43));

        // Writing zero frees the slot
        assert_eq!(storage.set(addr, U256::one(), U256::zero()), U256::from(43));
        assert_eq!(storage.slot_count(), 0);
    }

    #[test]
    fn test_isolation_between_contracts() {
        let mut storage = TransientStorage::new();
        let key = U256::one();
        storage.set(Address::from_low_u64(1), key, U256::from(100));

        assert_eq!(storage.get(&Address::from_low_u64(2), key), U256::zero());
    }

    #[test]
    fn test_clear() {
        let mut storage = TransientStorage::new();
        let addr = Address::from_low_u64(1);
        storage.set(addr, U256::one(), U256::one());
        storage.set(addr, U256::from(2), U256::from(2));
        assert_eq!(storage.slot_count(), 2);

        storage.clear();
        assert_eq!(storage.slot_count(), 0);
    }
}
