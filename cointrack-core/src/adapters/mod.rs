//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the LedgerStore port
//! - blockchain.info HTTP client for ChainDataProvider
//! - JSON fixtures for ChainDataProvider (offline runs and tests)

pub mod blockchain;
pub mod duckdb;
pub mod fixture;
pub mod paging;

#[cfg(test)]
pub mod blockchain_mock;
