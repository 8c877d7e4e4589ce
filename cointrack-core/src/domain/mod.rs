//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with no I/O.

mod account;
mod address;
mod transaction;
pub mod result;
pub mod sync;

pub use account::Account;
pub use address::{Address, AddressData};
pub use sync::{AddOutcome, RefreshOutcome, RemoveOutcome, ResyncOutcome};
pub use transaction::{StoredTransaction, Transaction};
