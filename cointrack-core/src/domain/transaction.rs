//! Transaction domain model

use serde::{Deserialize, Serialize};

/// An immutable transaction affecting one tracked address
///
/// The hash is globally unique and is the idempotent insert key: storing the
/// same hash twice never produces a second row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    /// Block height; 0 means unconfirmed
    pub block: u32,
    /// Signed effect on the owning address's balance, in satoshis
    pub result: i64,
}

impl Transaction {
    pub fn new(hash: impl Into<String>, block: u32, result: i64) -> Self {
        Self {
            hash: hash.into(),
            block,
            result,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.block > 0
    }
}

/// A transaction as persisted in the ledger, tagged with its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub hash: String,
    pub block: u32,
    pub result: i64,
    pub address: String,
}

impl StoredTransaction {
    pub fn from_transaction(tx: &Transaction, address: &str) -> Self {
        Self {
            hash: tx.hash.clone(),
            block: tx.block,
            result: tx.result,
            address: address.to_string(),
        }
    }
}

impl From<StoredTransaction> for Transaction {
    fn from(tx: StoredTransaction) -> Self {
        Self {
            hash: tx.hash,
            block: tx.block,
            result: tx.result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfirmed_transaction() {
        assert!(!Transaction::new("aa", 0, 100).is_confirmed());
        assert!(Transaction::new("bb", 812_000, -100).is_confirmed());
    }

    #[test]
    fn test_stored_transaction_keeps_fields() {
        let tx = Transaction::new("cafe", 42, -1500);
        let stored = StoredTransaction::from_transaction(&tx, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
        assert_eq!(stored.address, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT");
        assert_eq!(Transaction::from(stored), tx);
    }
}
