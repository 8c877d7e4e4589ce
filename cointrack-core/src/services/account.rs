//! Account service - the gateway in front of the sync engine
//!
//! Authenticates callers, validates address keys, serializes operations per
//! address and shapes batch results. Batches are best-effort: each address
//! is its own atomic unit, a failure is reported for that address and the
//! batch carries on. Nothing already applied is rolled back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use regex::Regex;

use crate::domain::result::{Error, OperationResult, Result};
use crate::domain::{Account, AddOutcome, RefreshOutcome, RemoveOutcome, ResyncOutcome};
use crate::ports::LedgerStore;
use crate::services::{AccountSummary, SummaryService, SyncService};

/// Base58 (P2PKH/P2SH, main and test nets) and bech32 address shapes
const ADDRESS_PATTERN: &str = r"^(?:[13mn2][a-km-zA-HJ-NP-Z1-9]{25,34}|(?:bc1|tb1)[02-9ac-hj-np-z]{6,87}|(?:BC1|TB1)[02-9AC-HJ-NP-Z]{6,87})$";

const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_.-]{1,64}$";

/// Lock table handing out one mutex per address key
#[derive(Default)]
struct AddressLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AddressLocks {
    fn get(&self, address: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;
        Ok(locks
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Run `f` while holding the lock for `address`
    fn with<T>(&self, address: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.get(address)?;
        let result = {
            // A panic in another holder does not corrupt the ledger, so a
            // poisoned address lock is still usable
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };
        self.release(address, lock);
        result
    }

    /// Drop the table entry once no other caller holds or waits on it
    fn release(&self, address: &str, lock: Arc<Mutex<()>>) {
        if let Ok(mut locks) = self.locks.lock() {
            // Clones are only handed out under the table lock, so the
            // table's copy plus ours means nobody else is interested
            if Arc::strong_count(&lock) == 2 {
                locks.remove(address);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

/// Canonical form of an address key
///
/// Bech32 is case-insensitive but only valid in one case; the lowercase
/// form is the stored key. Base58 is case-sensitive and left alone.
pub fn canonical_address(address: &str) -> String {
    let lower = address.to_ascii_lowercase();
    if lower.starts_with("bc1") || lower.starts_with("tb1") {
        lower
    } else {
        address.to_string()
    }
}

/// Account gateway
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    sync: Arc<SyncService>,
    summary: SummaryService,
    locks: AddressLocks,
    address_re: Regex,
    username_re: Regex,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>, sync: Arc<SyncService>) -> Result<Self> {
        let address_re = Regex::new(ADDRESS_PATTERN)
            .map_err(|e| Error::Config(format!("invalid address pattern: {}", e)))?;
        let username_re = Regex::new(USERNAME_PATTERN)
            .map_err(|e| Error::Config(format!("invalid username pattern: {}", e)))?;

        Ok(Self {
            summary: SummaryService::new(Arc::clone(&store)),
            store,
            sync,
            locks: AddressLocks::default(),
            address_re,
            username_re,
        })
    }

    /// Check that `address` has the shape of a Bitcoin address
    pub fn validate_address(&self, address: &str) -> Result<()> {
        if self.address_re.is_match(address) {
            Ok(())
        } else {
            Err(Error::validation(format!("Invalid address: {}", address)))
        }
    }

    /// Validate and canonicalize an address key supplied by a caller
    fn address_key(&self, address: &str) -> Result<String> {
        self.validate_address(address)?;
        Ok(canonical_address(address))
    }

    // === Accounts ===

    pub fn create_account(&self, username: &str, password: &str) -> Result<Account> {
        if !self.username_re.is_match(username) {
            return Err(Error::validation(
                "Username must be 1-64 characters of letters, digits, '_', '.' or '-'",
            ));
        }
        if password.is_empty() {
            return Err(Error::validation("Password must not be empty"));
        }
        if self.store.get_account(username)?.is_some() {
            return Err(Error::validation("Account already exists"));
        }

        let account = Account::new(username, hash_password(password)?);
        self.store.put_account(&account)?;
        Ok(account)
    }

    /// Verify credentials, returning the account
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Account> {
        let account = self
            .store
            .get_account(username)?
            .ok_or_else(|| Error::unauthorized("Account not found"))?;

        if !verify_password(password, &account.password_hash)? {
            return Err(Error::unauthorized("Invalid password"));
        }
        Ok(account)
    }

    // === Batches ===

    /// Track each address for the account
    pub fn add_addresses(
        &self,
        username: &str,
        password: &str,
        addresses: &[String],
    ) -> Result<Vec<OperationResult<AddOutcome>>> {
        let account = self.authenticate(username, password)?;

        Ok(addresses
            .iter()
            .map(|address| {
                let result = self.address_key(address).and_then(|key| {
                    self.locks
                        .with(&key, || self.sync.add_address(&key, &account.username))
                });
                OperationResult::from(result).with_context("address", address.as_str())
            })
            .collect())
    }

    /// Untrack each address the account owns; addresses owned by someone
    /// else report `NotTracked`
    pub fn remove_addresses(
        &self,
        username: &str,
        password: &str,
        addresses: &[String],
    ) -> Result<Vec<OperationResult<RemoveOutcome>>> {
        let account = self.authenticate(username, password)?;

        Ok(addresses
            .iter()
            .map(|address| {
                let result = self.address_key(address).and_then(|key| {
                    self.locks.with(&key, || {
                        match self.store.get_address(&key)? {
                            Some(tracked) if tracked.owner == account.username => {
                                self.sync.remove_address(&key)
                            }
                            _ => Ok(RemoveOutcome::NotTracked),
                        }
                    })
                });
                OperationResult::from(result).with_context("address", address.as_str())
            })
            .collect())
    }

    /// Stored balances and histories; no provider calls
    pub fn get_account_info(&self, username: &str, password: &str) -> Result<AccountSummary> {
        let account = self.authenticate(username, password)?;
        self.summary.summarize(&account.username)
    }

    /// Incrementally refresh every address the account owns
    pub fn update_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<OperationResult<RefreshOutcome>>> {
        let account = self.authenticate(username, password)?;

        Ok(self
            .store
            .list_addresses(&account.username)?
            .into_iter()
            .map(|address| {
                let result = self
                    .locks
                    .with(&address.key, || self.sync.refresh_address(&address.key));
                OperationResult::from(result).with_context("address", address.key.as_str())
            })
            .collect())
    }

    /// Full resync of one owned address
    pub fn resync_address(
        &self,
        username: &str,
        password: &str,
        address: &str,
    ) -> Result<ResyncOutcome> {
        let account = self.authenticate(username, password)?;
        let key = self.address_key(address)?;

        self.locks.with(&key, || match self.store.get_address(&key)? {
            Some(tracked) if tracked.owner == account.username => {
                self.sync.resync_address(&key)
            }
            _ => Err(Error::not_found(format!(
                "address {} is not tracked by this account",
                address
            ))),
        })
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::store(format!("Failed to encode salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::store(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::store(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
