//! Summary service - read-side aggregation for account reporting

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::{AddressData, Transaction};
use crate::ports::LedgerStore;

/// Everything an account holder sees about their tracked addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_balance: u64,
    pub total_transaction_count: u64,
    pub addresses: Vec<AddressData>,
}

impl AccountSummary {
    /// Fold per-address data into account totals
    pub fn from_addresses(addresses: Vec<AddressData>) -> Self {
        let account_balance = addresses.iter().map(|a| a.balance).sum();
        let total_transaction_count = addresses
            .iter()
            .map(|a| a.transactions.len() as u64)
            .sum();

        Self {
            account_balance,
            total_transaction_count,
            addresses,
        }
    }
}

/// Builds account summaries from stored data only; never calls a provider
pub struct SummaryService {
    store: Arc<dyn LedgerStore>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn summarize(&self, owner: &str) -> Result<AccountSummary> {
        let mut addresses = Vec::new();
        for address in self.store.list_addresses(owner)? {
            let transactions = self
                .store
                .list_transactions(&address.key)?
                .into_iter()
                .map(Transaction::from)
                .collect();
            addresses.push(AddressData {
                address: address.key,
                balance: address.balance,
                transactions,
            });
        }

        Ok(AccountSummary::from_addresses(addresses))
    }
}
