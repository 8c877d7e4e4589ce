//! Sync outcomes
//!
//! Each engine operation reports what it did. "Already tracked", "not
//! tracked" and "no change" are ordinary outcomes, distinguishable from
//! success but never errors.

use serde::{Deserialize, Serialize};

/// Outcome of tracking a new address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddOutcome {
    Added { balance: u64, transactions: usize },
    AlreadyTracked,
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

/// Outcome of untracking an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed { transactions: u64 },
    NotTracked,
}

impl RemoveOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// Outcome of an incremental refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The provider had nothing beyond the cursor; balance untouched
    NoChange,
    /// `new_transactions` were returned past the cursor. `skipped` of them
    /// were already stored, which means upstream ordering drifted.
    Updated {
        new_transactions: usize,
        skipped: usize,
        balance: u64,
    },
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// True when the provider re-delivered already stored transactions
    pub fn has_drift(&self) -> bool {
        matches!(self, Self::Updated { skipped, .. } if *skipped > 0)
    }
}

/// Outcome of a full resync from offset zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncOutcome {
    pub transactions_before: u64,
    pub transactions_after: u64,
    pub balance: u64,
}
