//! Chain data provider port
//!
//! Defines the interface for fetching address balances and transaction
//! history from an external block-data source (blockchain.info, fixtures).

use crate::domain::result::Result;
use crate::domain::AddressData;

/// Chain data provider trait
///
/// `fetch` returns the provider's current balance for `address` and every
/// transaction from position `offset` onwards in the provider's stable
/// ordering. Implementations page through their source internally; callers
/// never see partial pages.
///
/// An address unknown to the provider is not an error: it yields balance 0
/// and no transactions. Transport and decoding failures surface as
/// `Error::ProviderUnavailable`. Fetching has no side effects.
pub trait ChainDataProvider: Send + Sync {
    /// Provider name (e.g., "blockchain", "fixture")
    fn name(&self) -> &str;

    /// Fetch the balance and the transactions past `offset`
    fn fetch(&self, address: &str, offset: u64) -> Result<AddressData>;
}
