//! # World State
//!
//! Accounts, persistent storage and transient storage for the running
//! transaction, with a journal for frame-level rollback.
//!
//! ## Layers
//!
//! | Layer | Lifetime | Purpose |
//! |-------|----------|---------|
//! | Account / slot cache | across transactions | Current values, lazily loaded from the backend |
//! | Original slots | one transaction | SSTORE refund math |
//! | Journal | one transaction | Undo log for reverted frames |
//! | Transient storage | one transaction | EIP-1153 |
//!
//! Every mutation made while executing goes through the journal, so
//! [`WorldState::revert_to`] restores exactly what a failed frame touched.

use crate::domain::entities::Account;
use crate::domain::services::code_hash;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::{StateError, VmError};
use crate::evm::transient::TransientStorage;
use crate::ports::outbound::{StateBackend, StorageDelta};
use std::collections::{HashMap, HashSet};

/// Undo record for one state mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
    /// Account came into existence.
    AccountCreated {
        /// New account.
        address: Address,
    },
    /// Balance changed.
    BalanceChanged {
        /// Account.
        address: Address,
        /// Balance before.
        previous: U256,
    },
    /// Nonce changed.
    NonceChanged {
        /// Account.
        address: Address,
        /// Nonce before.
        previous: u64,
    },
    /// Code replaced.
    CodeChanged {
        /// Account.
        address: Address,
        /// Code before.
        previous: Bytes,
    },
    /// Persistent slot written.
    StorageChanged {
        /// Contract.
        address: Address,
        /// Slot key.
        key: U256,
        /// Value before.
        previous: U256,
    },
    /// Transient slot written.
    TransientChanged {
        /// Contract.
        address: Address,
        /// Slot key.
        key: U256,
        /// Value before.
        previous: U256,
    },
    /// Contract deployed in this transaction (EIP-6780 bookkeeping).
    ContractCreated {
        /// New contract.
        address: Address,
    },
}

/// Mutable world state.
#[derive(Debug, Default)]
pub struct WorldState {
    backend: Option<Box<dyn StateBackend>>,
    accounts: HashMap<Address, Option<Account>>,
    storage: HashMap<Address, HashMap<U256, U256>>,
    original: HashMap<(Address, U256), U256>,
    transient: TransientStorage,
    journal: Vec<JournalEntry>,
    created: HashSet<Address>,
    destroyed: HashSet<Address>,
    dirty_accounts: HashSet<Address>,
    dirty_slots: HashSet<(Address, U256)>,
    block_hashes: HashMap<u64, Hash>,
}

impl WorldState {
    /// Empty in-process state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State backed by `backend`.
    #[must_use]
    pub fn with_backend(backend: Box<dyn StateBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::default()
        }
    }

    /// The attached backend, if any.
    #[must_use]
    pub fn backend(&self) -> Option<&dyn StateBackend> {
        self.backend.as_deref()
    }

    // -------------------------------------------------------------------------
    // Setup (not journaled)
    // -------------------------------------------------------------------------

    /// Installs an account outside of any transaction (genesis, fixtures).
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, Some(account));
        self.dirty_accounts.insert(address);
    }

    /// Installs a storage value outside of any transaction.
    pub fn insert_storage(&mut self, address: Address, key: U256, value: U256) {
        self.storage.entry(address).or_default().insert(key, value);
        self.dirty_slots.insert((address, key));
    }

    /// Records the hash of a past block for BLOCKHASH.
    pub fn set_block_hash(&mut self, number: u64, hash: Hash) {
        self.block_hashes.insert(number, hash);
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    fn load(&mut self, address: &Address) -> Result<(), StateError> {
        if !self.accounts.contains_key(address) {
            let account = match &self.backend {
                Some(backend) if !self.destroyed.contains(address) => backend.account(address)?,
                _ => None,
            };
            self.accounts.insert(*address, account);
        }
        Ok(())
    }

    /// Account at `address`, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn account(&mut self, address: &Address) -> Result<Option<&Account>, StateError> {
        self.load(address)?;
        Ok(self.accounts.get(address).and_then(Option::as_ref))
    }

    fn account_mut(&mut self, address: Address) -> Result<&mut Account, StateError> {
        self.load(&address)?;
        self.dirty_accounts.insert(address);
        let slot = self.accounts.entry(address).or_insert(None);
        if slot.is_none() {
            self.journal.push(JournalEntry::AccountCreated { address });
        }
        Ok(slot.get_or_insert_with(Account::default))
    }

    /// Returns true if the account exists (possibly empty).
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn exists(&mut self, address: &Address) -> Result<bool, StateError> {
        Ok(self.account(address)?.is_some())
    }

    /// EIP-161 emptiness; non-existent accounts are empty.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn is_empty(&mut self, address: &Address) -> Result<bool, StateError> {
        Ok(self.account(address)?.map_or(true, Account::is_empty))
    }

    /// Account balance (zero if absent).
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn balance(&mut self, address: &Address) -> Result<U256, StateError> {
        Ok(self.account(address)?.map(|a| a.balance).unwrap_or_default())
    }

    /// Account nonce (zero if absent).
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn nonce(&mut self, address: &Address) -> Result<u64, StateError> {
        Ok(self.account(address)?.map_or(0, |a| a.nonce))
    }

    /// Account code (empty if absent).
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn code(&mut self, address: &Address) -> Result<Bytes, StateError> {
        Ok(self.account(address)?.map(|a| a.code.clone()).unwrap_or_default())
    }

    /// Code hash, `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn code_hash(&mut self, address: &Address) -> Result<Option<Hash>, StateError> {
        Ok(self.account(address)?.map(|a| a.code_hash))
    }

    /// Creates the account if absent. Used for value-less touches that must
    /// still bring an account into existence.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn touch(&mut self, address: Address) -> Result<(), StateError> {
        self.account_mut(address).map(|_| ())
    }

    /// Sets the balance.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), StateError> {
        let account = self.account_mut(address)?;
        let previous = std::mem::replace(&mut account.balance, balance);
        self.journal.push(JournalEntry::BalanceChanged { address, previous });
        Ok(())
    }

    /// Moves `value` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if `from` cannot cover `value`.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VmError> {
        let available = self.balance(&from)?;
        if available < value {
            return Err(VmError::InsufficientBalance { required: value, available });
        }
        self.touch(to)?;
        if value.is_zero() || from == to {
            return Ok(());
        }
        self.set_balance(from, available - value)?;
        let to_balance = self.balance(&to)?;
        self.set_balance(to, to_balance.overflowing_add(value).0)?;
        Ok(())
    }

    /// Sets the nonce.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError> {
        let account = self.account_mut(address)?;
        let previous = std::mem::replace(&mut account.nonce, nonce);
        self.journal.push(JournalEntry::NonceChanged { address, previous });
        Ok(())
    }

    /// Increments the nonce, returning the value before the increment.
    ///
    /// # Errors
    ///
    /// Returns `NonceOverflow` at `u64::MAX`.
    pub fn increment_nonce(&mut self, address: Address) -> Result<u64, VmError> {
        let nonce = self.nonce(&address)?;
        let next = nonce.checked_add(1).ok_or(VmError::NonceOverflow(address))?;
        self.set_nonce(address, next)?;
        Ok(nonce)
    }

    /// Replaces the code.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        let hash = code_hash(code.as_slice());
        let account = self.account_mut(address)?;
        account.code_hash = hash;
        let previous = std::mem::replace(&mut account.code, code);
        self.journal.push(JournalEntry::CodeChanged { address, previous });
        Ok(())
    }

    /// Marks `address` as deployed within the current transaction.
    pub fn mark_created(&mut self, address: Address) {
        if self.created.insert(address) {
            self.journal.push(JournalEntry::ContractCreated { address });
        }
    }

    /// Returns true if `address` was deployed within the current transaction.
    #[must_use]
    pub fn is_created(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    /// Deletes an account and its storage. Applied at transaction end for
    /// self-destructed accounts; not journaled.
    pub fn destroy_account(&mut self, address: Address) {
        self.accounts.insert(address, None);
        self.storage.remove(&address);
        self.original.retain(|(a, _), _| *a != address);
        self.dirty_slots.retain(|(a, _)| *a != address);
        self.destroyed.insert(address);
        self.dirty_accounts.insert(address);
    }

    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------

    fn load_slot(&mut self, address: &Address, key: U256) -> Result<U256, StateError> {
        if let Some(value) = self.storage.get(address).and_then(|s| s.get(&key)) {
            return Ok(*value);
        }
        let value = match &self.backend {
            Some(backend) if !self.destroyed.contains(address) => backend.storage(address, key)?,
            _ => U256::zero(),
        };
        self.storage.entry(*address).or_default().insert(key, value);
        Ok(value)
    }

    /// Current value of a persistent slot.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn storage(&mut self, address: &Address, key: U256) -> Result<U256, StateError> {
        let value = self.load_slot(address, key)?;
        self.original.entry((*address, key)).or_insert(value);
        Ok(value)
    }

    /// Value of a persistent slot at transaction start.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn original_storage(&mut self, address: &Address, key: U256) -> Result<U256, StateError> {
        if let Some(value) = self.original.get(&(*address, key)) {
            return Ok(*value);
        }
        self.storage(address, key)
    }

    /// Writes a persistent slot, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn set_storage(&mut self, address: Address, key: U256, value: U256) -> Result<U256, StateError> {
        let previous = self.storage(&address, key)?;
        self.storage.entry(address).or_default().insert(key, value);
        self.dirty_slots.insert((address, key));
        self.journal.push(JournalEntry::StorageChanged { address, key, previous });
        Ok(previous)
    }

    /// TLOAD.
    #[must_use]
    pub fn transient(&self, address: &Address, key: U256) -> U256 {
        self.transient.get(address, key)
    }

    /// TSTORE, journaled so reverted frames drop their writes.
    pub fn set_transient(&mut self, address: Address, key: U256, value: U256) {
        let previous = self.transient.set(address, key, value);
        self.journal.push(JournalEntry::TransientChanged { address, key, previous });
    }

    // -------------------------------------------------------------------------
    // Block hashes
    // -------------------------------------------------------------------------

    /// Hash of block `number` from the local table, then the backend.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the backend fails.
    pub fn block_hash(&self, number: u64) -> Result<Option<Hash>, StateError> {
        if let Some(hash) = self.block_hashes.get(&number) {
            return Ok(Some(*hash));
        }
        match &self.backend {
            Some(backend) => backend.block_hash(number),
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Journal
    // -------------------------------------------------------------------------

    /// Current journal position.
    #[must_use]
    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Undoes every mutation recorded after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            let Some(entry) = self.journal.pop() else { break };
            match entry {
                JournalEntry::AccountCreated { address } => {
                    self.accounts.insert(address, None);
                }
                JournalEntry::BalanceChanged { address, previous } => {
                    if let Some(Some(account)) = self.accounts.get_mut(&address) {
                        account.balance = previous;
                    }
                }
                JournalEntry::NonceChanged { address, previous } => {
                    if let Some(Some(account)) = self.accounts.get_mut(&address) {
                        account.nonce = previous;
                    }
                }
                JournalEntry::CodeChanged { address, previous } => {
                    if let Some(Some(account)) = self.accounts.get_mut(&address) {
                        account.code_hash = code_hash(previous.as_slice());
                        account.code = previous;
                    }
                }
                JournalEntry::StorageChanged { address, key, previous } => {
                    self.storage.entry(address).or_default().insert(key, previous);
                }
                JournalEntry::TransientChanged { address, key, previous } => {
                    self.transient.set(address, key, previous);
                }
                JournalEntry::ContractCreated { address } => {
                    self.created.remove(&address);
                }
            }
        }
    }

    /// Entries recorded after `checkpoint`.
    #[must_use]
    pub fn journal_since(&self, checkpoint: usize) -> &[JournalEntry] {
        self.journal.get(checkpoint..).unwrap_or_default()
    }

    /// Storage writes recorded after `checkpoint`, for tracing.
    #[must_use]
    pub fn storage_deltas_since(&self, checkpoint: usize) -> Vec<StorageDelta> {
        self.journal_since(checkpoint)
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::StorageChanged { address, key, previous } => Some(StorageDelta {
                    address: *address,
                    key: *key,
                    previous: *previous,
                    value: self
                        .storage
                        .get(address)
                        .and_then(|s| s.get(key))
                        .copied()
                        .unwrap_or_default(),
                    transient: false,
                }),
                JournalEntry::TransientChanged { address, key, previous } => Some(StorageDelta {
                    address: *address,
                    key: *key,
                    previous: *previous,
                    value: self.transient.get(address, *key),
                    transient: true,
                }),
                _ => None,
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Transaction boundary
    // -------------------------------------------------------------------------

    /// Drops per-transaction bookkeeping: journal, original values,
    /// transient storage and the created set. Current values are kept.
    pub fn reset_transaction(&mut self) {
        self.journal.clear();
        self.original.clear();
        self.transient.clear();
        self.created.clear();
    }

    /// Writes dirty accounts and slots to the backend. No-op without one.
    ///
    /// # Errors
    ///
    /// Returns the first `StateError` reported by the backend.
    pub fn flush(&mut self) -> Result<(), StateError> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        for address in self.destroyed.drain() {
            backend.delete_account(&address)?;
        }
        for address in self.dirty_accounts.drain() {
            match self.accounts.get(&address) {
                Some(Some(account)) => backend.set_account(address, account.clone())?,
                Some(None) => backend.delete_account(&address)?,
                None => {}
            }
        }
        for (address, key) in self.dirty_slots.drain() {
            if let Some(value) = self.storage.get(&address).and_then(|s| s.get(&key)) {
                backend.set_storage(address, key, *value)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_backend::InMemoryBackend;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn test_absent_account_reads_as_empty() {
        let mut state = WorldState::new();
        assert!(!state.exists(&addr(1)).unwrap());
        assert!(state.is_empty(&addr(1)).unwrap());
        assert_eq!(state.balance(&addr(1)).unwrap(), U256::zero());
        assert!(state.code(&addr(1)).unwrap().is_empty());
        assert_eq!(state.code_hash(&addr(1)).unwrap(), None);
    }

    #[test]
    fn test_revert_restores_everything() {
        let mut state = WorldState::new();
        state.insert_account(addr(1), Account::new_eoa(U256::from(100), 0));

        let cp = state.checkpoint();
        state.transfer(addr(1), addr(2), U256::from(40)).unwrap();
        state.increment_nonce(addr(1)).unwrap();
        state.set_code(addr(2), Bytes::from_slice(&[0x00])).unwrap();
        state.set_storage(addr(2), U256::one(), U256::from(9)).unwrap();
        state.set_transient(addr(2), U256::one(), U256::from(7));
        state.mark_created(addr(2));

        assert_eq!(state.balance(&addr(2)).unwrap(), U256::from(40));
        assert!(state.is_created(&addr(2)));

        state.revert_to(cp);
        assert_eq!(state.balance(&addr(1)).unwrap(), U256::from(100));
        assert_eq!(state.nonce(&addr(1)).unwrap(), 0);
        assert!(!state.exists(&addr(2)).unwrap());
        assert_eq!(state.storage(&addr(2), U256::one()).unwrap(), U256::zero());
        assert_eq!(state.transient(&addr(2), U256::one()), U256::zero());
        assert!(!state.is_created(&addr(2)));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut state = WorldState::new();
        state.insert_account(addr(1), Account::new_eoa(U256::from(5), 0));
        let err = state.transfer(addr(1), addr(2), U256::from(6)).unwrap_err();
        assert_eq!(
            err,
            VmError::InsufficientBalance {
                required: U256::from(6),
                available: U256::from(5)
            }
        );
    }

    #[test]
    fn test_original_storage_is_transaction_snapshot() {
        let mut state = WorldState::new();
        state.insert_storage(addr(1), U256::one(), U256::from(10));

        state.set_storage(addr(1), U256::one(), U256::from(20)).unwrap();
        state.set_storage(addr(1), U256::one(), U256::from(30)).unwrap();
        assert_eq!(state.original_storage(&addr(1), U256::one()).unwrap(), U256::from(10));
        assert_eq!(state.storage(&addr(1), U256::one()).unwrap(), U256::from(30));

        state.reset_transaction();
        assert_eq!(state.original_storage(&addr(1), U256::one()).unwrap(), U256::from(30));
    }

    #[test]
    fn test_nonce_overflow() {
        let mut state = WorldState::new();
        state.insert_account(addr(1), Account::new_eoa(U256::zero(), u64::MAX));
        assert_eq!(state.increment_nonce(addr(1)), Err(VmError::NonceOverflow(addr(1))));
    }

    #[test]
    fn test_storage_deltas() {
        let mut state = WorldState::new();
        let cp = state.checkpoint();
        state.set_storage(addr(1), U256::one(), U256::from(5)).unwrap();
        state.set_transient(addr(1), U256::one(), U256::from(6));
        state.set_balance(addr(1), U256::one()).unwrap();

        let deltas = state.storage_deltas_since(cp);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].value, U256::from(5));
        assert!(!deltas[0].transient);
        assert_eq!(deltas[1].value, U256::from(6));
        assert!(deltas[1].transient);
    }

    #[test]
    fn test_backend_lazy_load_and_flush() {
        let mut backend = InMemoryBackend::new();
        backend.insert_account(addr(1), Account::new_eoa(U256::from(50), 3));
        backend.insert_storage(addr(1), U256::one(), U256::from(8));

        let mut state = WorldState::with_backend(Box::new(backend));
        assert_eq!(state.nonce(&addr(1)).unwrap(), 3);
        assert_eq!(state.storage(&addr(1), U256::one()).unwrap(), U256::from(8));

        state.set_storage(addr(1), U256::one(), U256::from(9)).unwrap();
        state.set_balance(addr(2), U256::from(1)).unwrap();
        state.flush().unwrap();

        let backend = state.backend().unwrap();
        assert_eq!(backend.storage(&addr(1), U256::one()).unwrap(), U256::from(9));
        assert_eq!(backend.balance(&addr(2)).unwrap(), U256::one());
    }

    #[test]
    fn test_destroyed_account_ignores_backend() {
        let mut backend = InMemoryBackend::new();
        backend.insert_account(addr(1), Account::new_eoa(U256::from(50), 1));
        backend.insert_storage(addr(1), U256::one(), U256::from(8));

        let mut state = WorldState::with_backend(Box::new(backend));
        state.destroy_account(addr(1));
        assert!(!state.exists(&addr(1)).unwrap());
        assert_eq!(state.storage(&addr(1), U256::one()).unwrap(), U256::zero());

        state.flush().unwrap();
        let backend = state.backend().unwrap();
        assert_eq!(backend.account(&addr(1)).unwrap(), None);
        assert_eq!(backend.storage(&addr(1), U256::one()).unwrap(), U256::zero());
    }
}
