//! Sync service - incremental address synchronization
//!
//! Stateless orchestration over a ledger store and a chain data provider.
//! All state lives in the store: the sync cursor of an address is the number
//! of transactions already stored for it.
//!
//! The engine does not serialize operations on the same address; callers
//! that can race on one address must hold a per-address lock (see
//! `AccountService`).

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{AddOutcome, Address, RefreshOutcome, RemoveOutcome, ResyncOutcome};
use crate::ports::{ChainDataProvider, LedgerStore};

/// Sync engine for tracked addresses
pub struct SyncService {
    store: Arc<dyn LedgerStore>,
    provider: Arc<dyn ChainDataProvider>,
}

impl SyncService {
    pub fn new(store: Arc<dyn LedgerStore>, provider: Arc<dyn ChainDataProvider>) -> Self {
        Self { store, provider }
    }

    /// Name of the provider this engine fetches from
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Start tracking `address` for `owner`
    ///
    /// Fetches the full history before writing anything, so a provider
    /// failure leaves no trace of the address in the store.
    pub fn add_address(&self, address: &str, owner: &str) -> Result<AddOutcome> {
        if self.store.get_address(address)?.is_some() {
            return Ok(AddOutcome::AlreadyTracked);
        }

        let data = self.provider.fetch(address, 0)?;
        let inserted = self.store.insert_tracked_address(
            &Address::new(address, data.balance, owner),
            &data.transactions,
        )?;

        Ok(AddOutcome::Added {
            balance: data.balance,
            transactions: inserted,
        })
    }

    /// Stop tracking `address`, dropping its transactions first
    pub fn remove_address(&self, address: &str) -> Result<RemoveOutcome> {
        if self.store.get_address(address)?.is_none() {
            return Ok(RemoveOutcome::NotTracked);
        }

        let transactions = self.store.remove_tracked_address(address)?;
        Ok(RemoveOutcome::Removed { transactions })
    }

    /// Fetch transactions past the stored cursor
    ///
    /// The provider's balance is taken as-is; it is never rebuilt from
    /// deltas. Transactions returned past the cursor that are already
    /// stored (upstream reordering) are counted in `skipped` and left
    /// alone; `resync_address` is the explicit repair.
    pub fn refresh_address(&self, address: &str) -> Result<RefreshOutcome> {
        if self.store.get_address(address)?.is_none() {
            return Err(Error::not_found(format!("address {} is not tracked", address)));
        }

        let cursor = self.store.count_transactions(address)?;
        let data = self.provider.fetch(address, cursor)?;

        if data.transactions.is_empty() {
            return Ok(RefreshOutcome::NoChange);
        }

        let inserted = self
            .store
            .apply_refresh(address, data.balance, &data.transactions)?;

        Ok(RefreshOutcome::Updated {
            new_transactions: data.transactions.len(),
            skipped: data.transactions.len() - inserted,
            balance: data.balance,
        })
    }

    /// Refetch the whole history and replace the stored one atomically
    pub fn resync_address(&self, address: &str) -> Result<ResyncOutcome> {
        if self.store.get_address(address)?.is_none() {
            return Err(Error::not_found(format!("address {} is not tracked", address)));
        }

        let transactions_before = self.store.count_transactions(address)?;
        let data = self.provider.fetch(address, 0)?;
        self.store
            .replace_history(address, data.balance, &data.transactions)?;

        Ok(ResyncOutcome {
            transactions_before,
            transactions_after: self.store.count_transactions(address)?,
            balance: data.balance,
        })
    }
}
