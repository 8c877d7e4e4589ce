//! Fixture-backed chain data provider
//!
//! Serves address histories from JSON files (`<dir>/<address>.json`, same
//! shape as a `rawaddr` response holding the full history) or from memory.
//! Pages are cut and walked exactly like the live provider, so the engine
//! sees identical offset semantics in tests and offline runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use super::blockchain::DEFAULT_PAGE_SIZE;
use super::paging::{collect_history, RawAddrPage, RawTx};
use crate::domain::result::{Error, Result};
use crate::domain::{AddressData, Transaction};
use crate::ports::ChainDataProvider;

/// Fixture provider
pub struct FixtureProvider {
    fixture_dir: Option<PathBuf>,
    histories: RwLock<HashMap<String, RawAddrPage>>,
    page_size: u64,
    unavailable: AtomicBool,
    requests: Mutex<Vec<(String, u64)>>,
}

impl FixtureProvider {
    /// Provider with no fixtures; populate with `set_history`
    pub fn in_memory() -> Self {
        Self {
            fixture_dir: None,
            histories: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            unavailable: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider reading `<dir>/<address>.json` on every fetch
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Fixture directory does not exist: {}",
                dir.display()
            )));
        }
        Ok(Self {
            fixture_dir: Some(dir.to_path_buf()),
            ..Self::in_memory()
        })
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replace the history served for an address
    pub fn set_history(&self, address: &str, balance: u64, txs: &[Transaction]) {
        let page = RawAddrPage {
            final_balance: balance,
            txs: txs.iter().map(RawTx::from).collect(),
        };
        if let Ok(mut histories) = self.histories.write() {
            histories.insert(address.to_string(), page);
        }
    }

    /// Append transactions to an address's history and set its new balance
    pub fn append_history(&self, address: &str, balance: u64, txs: &[Transaction]) {
        if let Ok(mut histories) = self.histories.write() {
            let page = histories.entry(address.to_string()).or_default();
            page.final_balance = balance;
            page.txs.extend(txs.iter().map(RawTx::from));
        }
    }

    /// Simulate a transport failure on every fetch
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Offsets requested per fetch call for an address, in call order
    pub fn requested_offsets(&self, address: &str) -> Vec<u64> {
        self.requests
            .lock()
            .map(|requests| {
                requests
                    .iter()
                    .filter(|(a, _)| a == address)
                    .map(|(_, offset)| *offset)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full history for an address, memory first, then the fixture directory
    fn load_history(&self, address: &str) -> Result<RawAddrPage> {
        if let Some(page) = self
            .histories
            .read()
            .ok()
            .and_then(|histories| histories.get(address).cloned())
        {
            return Ok(page);
        }

        let Some(dir) = &self.fixture_dir else {
            return Err(Error::not_found(format!("no fixture for address {}", address)));
        };

        let path = dir.join(format!("{}.json", address));
        if !path.exists() {
            return Err(Error::not_found(format!("no fixture for address {}", address)));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::provider(format!("failed to read fixture {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::provider(format!("failed to decode fixture {}: {}", path.display(), e)))
    }

    fn page(history: &RawAddrPage, offset: u64, limit: u64) -> RawAddrPage {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(history.txs.len());
        let end = start.saturating_add(limit as usize).min(history.txs.len());
        RawAddrPage {
            final_balance: history.final_balance,
            txs: history.txs[start..end].to_vec(),
        }
    }
}

impl ChainDataProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch(&self, address: &str, offset: u64) -> Result<AddressData> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((address.to_string(), offset));
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::provider("fixture provider marked unavailable"));
        }

        // Snapshot once so every page of this call sees the same history
        let history = match self.load_history(address) {
            Ok(history) => history,
            Err(e) if e.is_not_found() => return Ok(AddressData::empty(address)),
            Err(e) => return Err(e),
        };

        collect_history(address, offset, self.page_size, |offset, limit| {
            Ok(Self::page(&history, offset, limit))
        })
    }
}
