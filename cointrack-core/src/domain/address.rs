//! Address domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Transaction;

/// A chain address tracked on behalf of an account
///
/// The address key maps to exactly one owning account at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Chain-specific address string (primary key)
    pub key: String,
    /// Current balance in the smallest currency unit (satoshis)
    pub balance: u64,
    /// Username of the owning account
    pub owner: String,
    pub tracked_at: DateTime<Utc>,
    /// Last time a provider fetch changed this address
    pub last_synced_at: DateTime<Utc>,
}

impl Address {
    pub fn new(key: impl Into<String>, balance: u64, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            balance,
            owner: owner.into(),
            tracked_at: now,
            last_synced_at: now,
        }
    }
}

/// Balance and transaction history of an address as served by a provider
/// (or as reported to an account holder)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressData {
    pub address: String,
    pub balance: u64,
    pub transactions: Vec<Transaction>,
}

impl AddressData {
    /// Data for an address the provider has never seen
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            balance: 0,
            transactions: Vec::new(),
        }
    }
}
