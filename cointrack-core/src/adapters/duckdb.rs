//! DuckDB ledger store implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Address, StoredTransaction, Transaction};
use crate::ports::LedgerStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

const ADDRESS_COLUMNS: &str = "addr_key, balance, username, tracked_at, last_synced_at";

/// DuckDB-backed ledger store
///
/// One connection behind a mutex; every composite write runs in a single
/// DuckDB transaction.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if !is_retryable_error(&err_msg) || attempt + 1 >= MAX_RETRIES {
                        return Err(e);
                    }
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[cointrack] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        err_msg
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// In-memory ledger, used by tests and dry runs
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: nothing here needs it and cached
        // extensions can fail code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run pending ledger migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Names of applied migrations
    pub fn applied_migrations(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        MigrationService::new(&conn).get_applied()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))
    }

    // === Row helpers ===

    fn row_to_address(row: &duckdb::Row) -> duckdb::Result<Address> {
        let tracked_at: String = row.get(3)?;
        let last_synced_at: String = row.get(4)?;
        Ok(Address {
            key: row.get(0)?,
            balance: row.get(1)?,
            owner: row.get(2)?,
            tracked_at: parse_timestamp(&tracked_at),
            last_synced_at: parse_timestamp(&last_synced_at),
        })
    }

    fn insert_address(conn: &Connection, address: &Address) -> Result<()> {
        conn.execute(
            "INSERT INTO sys_addresses (addr_key, balance, username, tracked_at, last_synced_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (addr_key) DO UPDATE SET
                balance = EXCLUDED.balance,
                username = EXCLUDED.username,
                last_synced_at = EXCLUDED.last_synced_at",
            params![
                address.key,
                address.balance,
                address.owner,
                address.tracked_at.to_rfc3339(),
                address.last_synced_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_transaction(conn: &Connection, tx: &Transaction, address: &str) -> Result<bool> {
        let changed = conn.execute(
            "INSERT INTO sys_transactions (tx_hash, block, result, addr_key)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (tx_hash) DO NOTHING",
            params![tx.hash, tx.block, tx.result, address],
        )?;
        Ok(changed > 0)
    }

    fn set_balance(conn: &Connection, key: &str, balance: u64) -> Result<()> {
        let changed = conn.execute(
            "UPDATE sys_addresses SET balance = ?, last_synced_at = ? WHERE addr_key = ?",
            params![balance, Utc::now().to_rfc3339(), key],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("address {} is not tracked", key)));
        }
        Ok(())
    }

    fn delete_address_transactions(conn: &Connection, key: &str) -> Result<u64> {
        let deleted = conn.execute("DELETE FROM sys_transactions WHERE addr_key = ?", [key])?;
        Ok(deleted as u64)
    }

    fn query_pairs(&self, sql: &str) -> Result<Vec<(String, String)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

impl LedgerStore for DuckDbRepository {
    // === Accounts ===

    fn get_account(&self, username: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        let account = conn
            .query_row(
                "SELECT username, password_hash, created_at FROM sys_accounts WHERE username = ?",
                [username],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(Account {
                        username: row.get(0)?,
                        password_hash: row.get(1)?,
                        created_at: parse_timestamp(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_accounts (username, password_hash, created_at) VALUES (?, ?, ?)",
            params![
                account.username,
                account.password_hash,
                account.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    // === Addresses ===

    fn get_address(&self, key: &str) -> Result<Option<Address>> {
        let conn = self.lock()?;
        let address = conn
            .query_row(
                &format!("SELECT {} FROM sys_addresses WHERE addr_key = ?", ADDRESS_COLUMNS),
                [key],
                Self::row_to_address,
            )
            .optional()?;
        Ok(address)
    }

    fn put_address(&self, address: &Address) -> Result<()> {
        let conn = self.lock()?;
        Self::insert_address(&conn, address)
    }

    fn update_balance(&self, key: &str, balance: u64) -> Result<()> {
        let conn = self.lock()?;
        Self::set_balance(&conn, key, balance)
    }

    fn delete_address(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_addresses WHERE addr_key = ?", [key])?;
        Ok(deleted > 0)
    }

    fn list_addresses(&self, owner: &str) -> Result<Vec<Address>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_addresses WHERE username = ? ORDER BY tracked_at, addr_key",
            ADDRESS_COLUMNS
        ))?;
        let rows = stmt.query_map([owner], Self::row_to_address)?;

        let mut addresses = Vec::new();
        for row in rows {
            addresses.push(row?);
        }
        Ok(addresses)
    }

    // === Transactions ===

    fn put_transaction(&self, tx: &StoredTransaction) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO sys_transactions (tx_hash, block, result, addr_key)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (tx_hash) DO NOTHING",
            params![tx.hash, tx.block, tx.result, tx.address],
        )?;
        Ok(changed > 0)
    }

    fn delete_transactions(&self, key: &str) -> Result<u64> {
        let conn = self.lock()?;
        Self::delete_address_transactions(&conn, key)
    }

    fn count_transactions(&self, key: &str) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_transactions WHERE addr_key = ?",
            [key],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list_transactions(&self, key: &str) -> Result<Vec<StoredTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT tx_hash, block, result, addr_key FROM sys_transactions
             WHERE addr_key = ?
             ORDER BY seq",
        )?;
        let rows = stmt.query_map([key], |row| {
            Ok(StoredTransaction {
                hash: row.get(0)?,
                block: row.get(1)?,
                result: row.get(2)?,
                address: row.get(3)?,
            })
        })?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?);
        }
        Ok(transactions)
    }

    // === Composite writes, each in one DuckDB transaction ===

    fn insert_tracked_address(&self, address: &Address, txs: &[Transaction]) -> Result<usize> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;

        let mut inserted = 0;
        for tx in txs {
            if Self::insert_transaction(&db_tx, tx, &address.key)? {
                inserted += 1;
            }
        }
        Self::insert_address(&db_tx, address)?;

        db_tx.commit()?;
        Ok(inserted)
    }

    fn remove_tracked_address(&self, key: &str) -> Result<u64> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;

        let removed = Self::delete_address_transactions(&db_tx, key)?;
        db_tx.execute("DELETE FROM sys_addresses WHERE addr_key = ?", [key])?;

        db_tx.commit()?;
        Ok(removed)
    }

    fn apply_refresh(&self, key: &str, balance: u64, txs: &[Transaction]) -> Result<usize> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;

        let mut inserted = 0;
        for tx in txs {
            if Self::insert_transaction(&db_tx, tx, key)? {
                inserted += 1;
            }
        }
        Self::set_balance(&db_tx, key, balance)?;

        db_tx.commit()?;
        Ok(inserted)
    }

    /// Hashes that disappeared upstream are deleted, surviving ones get
    /// their block and result refreshed, new ones are appended. Rows are
    /// never deleted and re-inserted under the same key in one transaction.
    fn replace_history(&self, key: &str, balance: u64, txs: &[Transaction]) -> Result<()> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;

        let fresh: HashSet<&str> = txs.iter().map(|t| t.hash.as_str()).collect();
        let stored: Vec<String> = {
            let mut stmt = db_tx.prepare("SELECT tx_hash FROM sys_transactions WHERE addr_key = ?")?;
            let rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
            let mut hashes = Vec::new();
            for row in rows {
                hashes.push(row?);
            }
            hashes
        };

        for hash in stored.iter().filter(|h| !fresh.contains(h.as_str())) {
            db_tx.execute("DELETE FROM sys_transactions WHERE tx_hash = ?", params![hash])?;
        }

        for tx in txs {
            if !Self::insert_transaction(&db_tx, tx, key)? {
                db_tx.execute(
                    "UPDATE sys_transactions SET block = ?, result = ?
                     WHERE tx_hash = ? AND addr_key = ?",
                    params![tx.block, tx.result, tx.hash, key],
                )?;
            }
        }
        Self::set_balance(&db_tx, key, balance)?;

        db_tx.commit()?;
        Ok(())
    }

    // === Health checks ===

    fn orphaned_transactions(&self) -> Result<Vec<(String, String)>> {
        self.query_pairs(
            "SELECT t.tx_hash, t.addr_key FROM sys_transactions t
             LEFT JOIN sys_addresses a ON t.addr_key = a.addr_key
             WHERE a.addr_key IS NULL
             ORDER BY t.seq",
        )
    }

    fn ownerless_addresses(&self) -> Result<Vec<(String, String)>> {
        self.query_pairs(
            "SELECT a.addr_key, a.username FROM sys_addresses a
             LEFT JOIN sys_accounts u ON a.username = u.username
             WHERE u.username IS NULL
             ORDER BY a.addr_key",
        )
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
