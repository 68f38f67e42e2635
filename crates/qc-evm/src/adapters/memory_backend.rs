//! # In-Memory Backend
//!
//! Reference [`StateBackend`] kept entirely in hash maps. Used by tests and
//! harnesses; a production embedder would put its database behind the same
//! trait.

use crate::domain::entities::Account;
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::StateError;
use crate::ports::outbound::StateBackend;
use std::collections::HashMap;

/// In-memory state for testing.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    accounts: HashMap<Address, Account>,
    storage: HashMap<(Address, U256), U256>,
    block_hashes: HashMap<u64, Hash>,
    read_only: bool,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every write with [`StateError::ReadOnly`].
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Seed an account.
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Seed a storage value.
    pub fn insert_storage(&mut self, address: Address, key: U256, value: U256) {
        self.storage.insert((address, key), value);
    }

    /// Seed a block hash.
    pub fn insert_block_hash(&mut self, number: u64, hash: Hash) {
        self.block_hashes.insert(number, hash);
    }

    /// Number of accounts held.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn check_writable(&self) -> Result<(), StateError> {
        if self.read_only {
            Err(StateError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl StateBackend for InMemoryBackend {
    fn account(&self, address: &Address) -> Result<Option<Account>, StateError> {
        Ok(self.accounts.get(address).cloned())
    }

    fn storage(&self, address: &Address, key: U256) -> Result<U256, StateError> {
        Ok(self.storage.get(&(*address, key)).copied().unwrap_or_default())
    }

    fn block_hash(&self, number: u64) -> Result<Option<Hash>, StateError> {
        Ok(self.block_hashes.get(&number).copied())
    }

    fn set_account(&mut self, address: Address, account: Account) -> Result<(), StateError> {
        self.check_writable()?;
        self.accounts.insert(address, account);
        Ok(())
    }

    fn set_storage(&mut self, address: Address, key: U256, value: U256) -> Result<(), StateError> {
        self.check_writable()?;
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
        Ok(())
    }

    fn delete_account(&mut self, address: &Address) -> Result<(), StateError> {
        self.check_writable()?;
        self.accounts.remove(address);
        self.storage.retain(|(a, _), _| a != address);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Bytes;

    #[test]
    fn test_account_defaults() {
        let backend = InMemoryBackend::new();
        let addr = Address::from_low_u64(1);
        assert_eq!(backend.account(&addr).unwrap(), None);
        assert_eq!(backend.balance(&addr).unwrap(), U256::zero());
        assert_eq!(backend.nonce(&addr).unwrap(), 0);
        assert!(backend.code(&addr).unwrap().is_empty());
    }

    #[test]
    fn test_setters_create_account() {
        let mut backend = InMemoryBackend::new();
        let addr = Address::from_low_u64(1);

        backend.set_balance(addr, U256::from(5)).unwrap();
        backend.set_nonce(addr, 2).unwrap();
        backend.set_code(addr, Bytes::from_slice(&[0x60, 0x00])).unwrap();

        let account = backend.account(&addr).unwrap().unwrap();
        assert_eq!(account.balance, U256::from(5));
        assert_eq!(account.nonce, 2);
        assert!(account.has_code());
        assert_ne!(account.code_hash, Account::EMPTY_CODE_HASH);
    }

    #[test]
    fn test_delete_removes_storage() {
        let mut backend = InMemoryBackend::new();
        let addr = Address::from_low_u64(1);
        backend.insert_account(addr, Account::default());
        backend.set_storage(addr, U256::one(), U256::from(3)).unwrap();

        backend.delete_account(&addr).unwrap();
        assert_eq!(backend.account_count(), 0);
        assert_eq!(backend.storage(&addr, U256::one()).unwrap(), U256::zero());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mut backend = InMemoryBackend::new().read_only();
        let addr = Address::from_low_u64(1);
        assert_eq!(
            backend.set_storage(addr, U256::one(), U256::one()),
            Err(StateError::ReadOnly)
        );
        assert_eq!(backend.delete_account(&addr), Err(StateError::ReadOnly));
    }
}
