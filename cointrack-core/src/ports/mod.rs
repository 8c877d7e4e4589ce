//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The sync engine
//! depends only on these traits, not on concrete implementations.

mod data_provider;
mod ledger_store;

pub use data_provider::ChainDataProvider;
pub use ledger_store::LedgerStore;
