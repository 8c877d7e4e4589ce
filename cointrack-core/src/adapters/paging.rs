//! Offset-based pagination over rawaddr-style sources
//!
//! Both the live blockchain.info client and the fixture provider serve pages
//! of `{ final_balance, txs }`. `Pages` walks those pages lazily from a
//! starting offset until the source returns an empty page; `collect_history`
//! drains it into one `AddressData` so the sync engine never sees a partial
//! page.

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{AddressData, Transaction};

/// Hard stop for sources that keep returning data regardless of offset
pub const MAX_PAGES: usize = 100_000;

/// One page of an address's history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAddrPage {
    pub final_balance: u64,
    #[serde(default)]
    pub txs: Vec<RawTx>,
}

/// Transaction as served by a rawaddr-style source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTx {
    pub hash: String,
    /// Confirmed height; absent or null while unconfirmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    /// Fallback used by older payloads and fixtures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_index: Option<u64>,
    pub result: i64,
}

impl RawTx {
    pub fn to_transaction(&self) -> Transaction {
        let block = self
            .block_height
            .or_else(|| self.block_index.and_then(|b| u32::try_from(b).ok()))
            .unwrap_or(0);
        Transaction::new(self.hash.clone(), block, self.result)
    }
}

impl From<&Transaction> for RawTx {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: tx.hash.clone(),
            block_height: Some(tx.block),
            block_index: None,
            result: tx.result,
        }
    }
}

/// Lazy, finite sequence of pages starting at an offset
///
/// `fetch_page(offset, limit)` is called once per page. The sequence ends
/// after the first empty page or the first error. The offset advances by
/// the number of transactions actually returned, so sources that cap the
/// page size below `page_size` are still walked correctly.
pub struct Pages<F> {
    fetch_page: F,
    offset: u64,
    page_size: u64,
    pages_read: usize,
    finished: bool,
}

impl<F> Pages<F>
where
    F: FnMut(u64, u64) -> Result<RawAddrPage>,
{
    pub fn new(offset: u64, page_size: u64, fetch_page: F) -> Self {
        Self {
            fetch_page,
            offset,
            page_size: page_size.max(1),
            pages_read: 0,
            finished: false,
        }
    }

    /// Offset the next page will be requested from
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<F> Iterator for Pages<F>
where
    F: FnMut(u64, u64) -> Result<RawAddrPage>,
{
    type Item = Result<RawAddrPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.pages_read >= MAX_PAGES {
            self.finished = true;
            return Some(Err(Error::provider(format!(
                "pagination did not terminate after {} pages",
                MAX_PAGES
            ))));
        }

        self.pages_read += 1;
        match (self.fetch_page)(self.offset, self.page_size) {
            Ok(page) => {
                if page.txs.is_empty() {
                    self.finished = true;
                } else {
                    self.offset += page.txs.len() as u64;
                }
                Some(Ok(page))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Drain every page past `offset` into a single `AddressData`
///
/// The balance comes from the last page fetched, i.e. the most recent one.
/// `NotFound` from the source means the address has no history there: on
/// the first page it yields balance 0, later it simply ends the walk.
pub fn collect_history<F>(address: &str, offset: u64, page_size: u64, fetch_page: F) -> Result<AddressData>
where
    F: FnMut(u64, u64) -> Result<RawAddrPage>,
{
    let mut data = AddressData::empty(address);

    for page in Pages::new(offset, page_size, fetch_page) {
        match page {
            Ok(page) => {
                data.balance = page.final_balance;
                data.transactions
                    .extend(page.txs.iter().map(RawTx::to_transaction));
            }
            Err(e) if e.is_not_found() => break,
            Err(e) => return Err(e),
        }
    }

    Ok(data)
}
