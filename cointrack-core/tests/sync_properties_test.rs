//! Sync engine properties, checked against every ledger store
//!
//! Each property runs once on a file-backed DuckDB ledger and once on the
//! in-memory store that only implements the primitive trait methods, so the
//! default composite writes are covered too.
//!
//! Run with: cargo test --test sync_properties_test -- --nocapture

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use cointrack_core::adapters::fixture::FixtureProvider;
use cointrack_core::domain::result::Error;
use cointrack_core::services::SyncService;
use cointrack_core::{
    AddOutcome, LedgerStore, RefreshOutcome, RemoveOutcome, StoredTransaction, Transaction,
};

use common::{duckdb_store, fixture_provider, stored_hashes, txs, MemoryStore};

const ADDR: &str = "A";

/// Run `check` against both store implementations
fn for_each_store(check: impl Fn(Arc<dyn LedgerStore>, Arc<FixtureProvider>)) {
    let temp_dir = TempDir::new().unwrap();
    let duckdb: Arc<dyn LedgerStore> = duckdb_store(&temp_dir);
    check(duckdb, fixture_provider());

    let memory: Arc<dyn LedgerStore> = MemoryStore::new();
    check(memory, fixture_provider());
}

fn engine(store: &Arc<dyn LedgerStore>, provider: &Arc<FixtureProvider>) -> SyncService {
    SyncService::new(Arc::clone(store), provider.clone())
}

#[test]
fn test_end_to_end_add_then_refresh() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);

        provider.set_history(ADDR, 500, &[Transaction::new("h1", 1, 500)]);
        let added = engine.add_address(ADDR, "alice").unwrap();
        assert_eq!(added, AddOutcome::Added { balance: 500, transactions: 1 });
        assert_eq!(store.count_transactions(ADDR).unwrap(), 1);
        assert_eq!(store.get_address(ADDR).unwrap().unwrap().balance, 500);

        provider.append_history(ADDR, 300, &[Transaction::new("h2", 2, -200)]);
        let refreshed = engine.refresh_address(ADDR).unwrap();
        assert_eq!(
            refreshed,
            RefreshOutcome::Updated { new_transactions: 1, skipped: 0, balance: 300 }
        );
        assert_eq!(provider.requested_offsets(ADDR), vec![0, 1]);
        assert_eq!(store.count_transactions(ADDR).unwrap(), 2);
        assert_eq!(store.get_address(ADDR).unwrap().unwrap().balance, 300);
        assert_eq!(stored_hashes(store.as_ref(), ADDR), vec!["h1", "h2"]);
    });
}

#[test]
fn test_add_twice_is_idempotent() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);
        provider.set_history(ADDR, 30, &txs("t", 0, 3));

        assert!(engine.add_address(ADDR, "alice").unwrap().is_added());
        assert_eq!(engine.add_address(ADDR, "alice").unwrap(), AddOutcome::AlreadyTracked);

        assert_eq!(store.list_addresses("alice").unwrap().len(), 1);
        assert_eq!(store.count_transactions(ADDR).unwrap(), 3);
    });
}

#[test]
fn test_refresh_cursor_and_provider_balance() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);
        provider.set_history(ADDR, 100, &txs("t", 0, 10));
        engine.add_address(ADDR, "alice").unwrap();

        // Balance is taken from the provider, not summed from deltas
        provider.append_history(ADDR, 12_345, &txs("t", 10, 2));
        engine.refresh_address(ADDR).unwrap();

        assert_eq!(provider.requested_offsets(ADDR), vec![0, 10]);
        assert_eq!(store.count_transactions(ADDR).unwrap(), 12);
        assert_eq!(store.get_address(ADDR).unwrap().unwrap().balance, 12_345);
    });
}

#[test]
fn test_refresh_with_nothing_new_is_no_change() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);
        provider.set_history(ADDR, 100, &txs("t", 0, 4));
        engine.add_address(ADDR, "alice").unwrap();

        provider.set_history(ADDR, 1, &txs("t", 0, 4));
        assert_eq!(engine.refresh_address(ADDR).unwrap(), RefreshOutcome::NoChange);
        assert_eq!(store.get_address(ADDR).unwrap().unwrap().balance, 100);
        assert_eq!(store.count_transactions(ADDR).unwrap(), 4);
    });
}

#[test]
fn test_remove_cascades() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);
        provider.set_history(ADDR, 30, &txs("t", 0, 3));
        engine.add_address(ADDR, "alice").unwrap();

        assert_eq!(
            engine.remove_address(ADDR).unwrap(),
            RemoveOutcome::Removed { transactions: 3 }
        );
        assert!(store.get_address(ADDR).unwrap().is_none());
        assert_eq!(store.count_transactions(ADDR).unwrap(), 0);
        assert_eq!(engine.remove_address(ADDR).unwrap(), RemoveOutcome::NotTracked);
    });
}

#[test]
fn test_redelivered_hash_never_duplicates() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);

        // The provider repeats a hash within one history
        let mut history = txs("t", 0, 2);
        history.push(history[0].clone());
        provider.set_history(ADDR, 20, &history);

        let added = engine.add_address(ADDR, "alice").unwrap();
        assert_eq!(added, AddOutcome::Added { balance: 20, transactions: 2 });

        // And a retried insert of a stored hash is a no-op
        let replay = StoredTransaction::from_transaction(&history[1], ADDR);
        assert!(!store.put_transaction(&replay).unwrap());

        assert_eq!(stored_hashes(store.as_ref(), ADDR), vec!["t-0", "t-1"]);
    });
}

#[test]
fn test_provider_failure_leaves_store_untouched() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);
        provider.set_history("B", 10, &txs("b", 0, 1));
        provider.set_unavailable(true);

        let result = engine.add_address("B", "alice");
        assert!(matches!(result, Err(Error::ProviderUnavailable(_))));
        assert!(store.get_address("B").unwrap().is_none());
        assert_eq!(store.count_transactions("B").unwrap(), 0);

        provider.set_unavailable(false);
        engine.add_address("B", "alice").unwrap();
        provider.append_history("B", 99, &txs("b", 1, 2));
        provider.set_unavailable(true);

        assert!(engine.refresh_address("B").is_err());
        assert!(engine.resync_address("B").is_err());
        assert_eq!(store.count_transactions("B").unwrap(), 1);
        assert_eq!(store.get_address("B").unwrap().unwrap().balance, 10);
    });
}

#[test]
fn test_resync_repairs_drift() {
    for_each_store(|store, provider| {
        let engine = engine(&store, &provider);
        provider.set_history(ADDR, 30, &txs("t", 0, 3));
        engine.add_address(ADDR, "alice").unwrap();

        // A late transaction lands at position 1 upstream, so t-2 is
        // served again past the cursor
        let mut upstream = txs("t", 0, 1);
        upstream.push(Transaction::new("late", 99, 10));
        upstream.extend(txs("t", 1, 3));
        provider.set_history(ADDR, 40, &upstream);

        let refreshed = engine.refresh_address(ADDR).unwrap();
        assert_eq!(
            refreshed,
            RefreshOutcome::Updated { new_transactions: 2, skipped: 1, balance: 40 }
        );
        assert!(refreshed.has_drift());
        // The late transaction is still missing
        assert_eq!(store.count_transactions(ADDR).unwrap(), 4);

        let outcome = engine.resync_address(ADDR).unwrap();
        assert_eq!(outcome.transactions_before, 4);
        assert_eq!(outcome.transactions_after, 5);
        assert_eq!(outcome.balance, 40);

        let mut hashes = stored_hashes(store.as_ref(), ADDR);
        hashes.sort();
        assert_eq!(hashes, vec!["late", "t-0", "t-1", "t-2", "t-3"]);
        assert_eq!(store.get_address(ADDR).unwrap().unwrap().balance, 40);
    });
}

#[test]
fn test_ledger_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let provider = fixture_provider();
    provider.set_history(ADDR, 500, &[Transaction::new("h1", 1, 500)]);

    {
        let store: Arc<dyn LedgerStore> = duckdb_store(&temp_dir);
        engine(&store, &provider).add_address(ADDR, "alice").unwrap();
    }

    let store: Arc<dyn LedgerStore> = duckdb_store(&temp_dir);
    provider.append_history(ADDR, 300, &[Transaction::new("h2", 2, -200)]);
    engine(&store, &provider).refresh_address(ADDR).unwrap();

    assert_eq!(provider.requested_offsets(ADDR), vec![0, 1]);
    assert_eq!(store.count_transactions(ADDR).unwrap(), 2);
}
