//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use cointrack_core::adapters::duckdb::DuckDbRepository;
use cointrack_core::adapters::fixture::FixtureProvider;
use cointrack_core::domain::result::{Error, Result};
use cointrack_core::{Account, Address, LedgerStore, StoredTransaction, Transaction};

/// Valid mainnet addresses for gateway-level tests
pub const ADDR_A: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
pub const ADDR_B: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";
pub const ADDR_C: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

/// File-backed DuckDB ledger in a temp directory
pub fn duckdb_store(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let repo = DuckDbRepository::new(&temp_dir.path().join("ledger.duckdb"))
        .expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

pub fn fixture_provider() -> Arc<FixtureProvider> {
    Arc::new(FixtureProvider::in_memory())
}

/// `count` transactions starting at `start`, each worth 10 sats
pub fn txs(prefix: &str, start: usize, count: usize) -> Vec<Transaction> {
    (start..start + count)
        .map(|i| Transaction::new(format!("{}-{}", prefix, i), 100 + i as u32, 10))
        .collect()
}

pub fn stored_hashes(store: &dyn LedgerStore, key: &str) -> Vec<String> {
    store
        .list_transactions(key)
        .unwrap()
        .into_iter()
        .map(|t| t.hash)
        .collect()
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    addresses: HashMap<String, Address>,
    /// Insertion ordered, hash unique
    transactions: Vec<StoredTransaction>,
}

/// Minimal ledger store relying on the trait's default composite writes
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }
}

impl LedgerStore for MemoryStore {
    fn get_account(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.tables()?.accounts.get(username).cloned())
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.tables()?
            .accounts
            .insert(account.username.clone(), account.clone());
        Ok(())
    }

    fn get_address(&self, key: &str) -> Result<Option<Address>> {
        Ok(self.tables()?.addresses.get(key).cloned())
    }

    fn put_address(&self, address: &Address) -> Result<()> {
        self.tables()?
            .addresses
            .insert(address.key.clone(), address.clone());
        Ok(())
    }

    fn update_balance(&self, key: &str, balance: u64) -> Result<()> {
        let mut tables = self.tables()?;
        let address = tables
            .addresses
            .get_mut(key)
            .ok_or_else(|| Error::not_found(key.to_string()))?;
        address.balance = balance;
        Ok(())
    }

    fn delete_address(&self, key: &str) -> Result<bool> {
        Ok(self.tables()?.addresses.remove(key).is_some())
    }

    fn list_addresses(&self, owner: &str) -> Result<Vec<Address>> {
        let mut addresses: Vec<_> = self
            .tables()?
            .addresses
            .values()
            .filter(|a| a.owner == owner)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(addresses)
    }

    fn put_transaction(&self, tx: &StoredTransaction) -> Result<bool> {
        let mut tables = self.tables()?;
        if tables.transactions.iter().any(|t| t.hash == tx.hash) {
            return Ok(false);
        }
        tables.transactions.push(tx.clone());
        Ok(true)
    }

    fn delete_transactions(&self, key: &str) -> Result<u64> {
        let mut tables = self.tables()?;
        let before = tables.transactions.len();
        tables.transactions.retain(|t| t.address != key);
        Ok((before - tables.transactions.len()) as u64)
    }

    fn count_transactions(&self, key: &str) -> Result<u64> {
        Ok(self
            .tables()?
            .transactions
            .iter()
            .filter(|t| t.address == key)
            .count() as u64)
    }

    fn list_transactions(&self, key: &str) -> Result<Vec<StoredTransaction>> {
        Ok(self
            .tables()?
            .transactions
            .iter()
            .filter(|t| t.address == key)
            .cloned()
            .collect())
    }

    fn orphaned_transactions(&self) -> Result<Vec<(String, String)>> {
        let tables = self.tables()?;
        Ok(tables
            .transactions
            .iter()
            .filter(|t| !tables.addresses.contains_key(&t.address))
            .map(|t| (t.hash.clone(), t.address.clone()))
            .collect())
    }

    fn ownerless_addresses(&self) -> Result<Vec<(String, String)>> {
        let tables = self.tables()?;
        Ok(tables
            .addresses
            .values()
            .filter(|a| !tables.accounts.contains_key(&a.owner))
            .map(|a| (a.key.clone(), a.owner.clone()))
            .collect())
    }
}
