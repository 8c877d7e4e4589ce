//! Ledger store port - durable storage for accounts, addresses and transactions

use crate::domain::result::Result;
use crate::domain::{Account, Address, StoredTransaction, Transaction};

/// Ledger store abstraction
///
/// The primitive operations mirror single-row reads and writes. The composite
/// `*_tracked_*` / `apply_refresh` / `replace_history` methods default to a
/// sequential fallback built from the primitives; stores with multi-row
/// transactions override them to commit atomically.
pub trait LedgerStore: Send + Sync {
    // === Accounts ===

    fn get_account(&self, username: &str) -> Result<Option<Account>>;

    /// Insert a new account. Fails if the username is taken.
    fn put_account(&self, account: &Account) -> Result<()>;

    // === Addresses ===

    fn get_address(&self, key: &str) -> Result<Option<Address>>;

    /// Insert or overwrite an address row
    fn put_address(&self, address: &Address) -> Result<()>;

    /// Overwrite the stored balance and bump `last_synced_at`
    fn update_balance(&self, key: &str, balance: u64) -> Result<()>;

    /// Returns true if a row was deleted
    fn delete_address(&self, key: &str) -> Result<bool>;

    fn list_addresses(&self, owner: &str) -> Result<Vec<Address>>;

    // === Transactions ===

    /// Insert a transaction keyed by hash. A hash that already exists is
    /// left untouched and `false` is returned.
    fn put_transaction(&self, tx: &StoredTransaction) -> Result<bool>;

    /// Returns the number of rows deleted
    fn delete_transactions(&self, key: &str) -> Result<u64>;

    /// Number of stored transactions for an address (the sync cursor)
    fn count_transactions(&self, key: &str) -> Result<u64>;

    /// Transactions for an address in the order they were stored
    fn list_transactions(&self, key: &str) -> Result<Vec<StoredTransaction>>;

    // === Composite writes ===

    /// Persist a freshly fetched address with its history.
    ///
    /// Returns the number of transaction rows inserted. The fallback writes
    /// transactions before the address row, so an interrupted add leaves the
    /// address untracked and a retry converges.
    fn insert_tracked_address(&self, address: &Address, txs: &[Transaction]) -> Result<usize> {
        let mut inserted = 0;
        for tx in txs {
            if self.put_transaction(&StoredTransaction::from_transaction(tx, &address.key))? {
                inserted += 1;
            }
        }
        self.put_address(address)?;
        Ok(inserted)
    }

    /// Delete an address and all of its transactions.
    ///
    /// Returns the number of transactions removed. Transactions go first so
    /// an interrupted remove leaves the address row present and detectable.
    fn remove_tracked_address(&self, key: &str) -> Result<u64> {
        let removed = self.delete_transactions(key)?;
        self.delete_address(key)?;
        Ok(removed)
    }

    /// Store new transactions past the cursor and overwrite the balance.
    ///
    /// Returns the number of transaction rows inserted.
    fn apply_refresh(&self, key: &str, balance: u64, txs: &[Transaction]) -> Result<usize> {
        let mut inserted = 0;
        for tx in txs {
            if self.put_transaction(&StoredTransaction::from_transaction(tx, key))? {
                inserted += 1;
            }
        }
        self.update_balance(key, balance)?;
        Ok(inserted)
    }

    /// Replace an address's whole history with a full fetch.
    fn replace_history(&self, key: &str, balance: u64, txs: &[Transaction]) -> Result<()> {
        self.delete_transactions(key)?;
        for tx in txs {
            self.put_transaction(&StoredTransaction::from_transaction(tx, key))?;
        }
        self.update_balance(key, balance)
    }

    // === Health checks ===

    /// Transactions whose address row is missing, as (hash, address) pairs
    fn orphaned_transactions(&self) -> Result<Vec<(String, String)>>;

    /// Addresses whose owning account is missing, as (address, owner) pairs
    fn ownerless_addresses(&self) -> Result<Vec<(String, String)>>;
}
