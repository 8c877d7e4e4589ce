//! blockchain.info API client
//!
//! Fetches address balances and transaction history from the public
//! `rawaddr` endpoint, paging with `limit`/`offset` until exhausted.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use super::paging::{collect_history, RawAddrPage};
use crate::domain::result::{Error, Result};
use crate::domain::AddressData;
use crate::ports::ChainDataProvider;

/// Production API root
pub const BLOCKCHAIN_PRODUCTION_URL: &str = "https://blockchain.info";

/// Transactions requested per page
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// blockchain.info API client
#[derive(Debug)]
pub struct BlockchainClient {
    client: Client,
    base_url: String,
    page_size: u64,
}

impl BlockchainClient {
    /// Create a client against the production API
    pub fn new() -> Result<Self> {
        Self::with_options(
            BLOCKCHAIN_PRODUCTION_URL,
            DEFAULT_PAGE_SIZE,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client with a custom base URL, page size and timeout
    pub fn with_options(base_url: &str, page_size: u64, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid provider URL '{}': {}", base_url, e)))?;

        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(Error::Config(format!(
                "Provider URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if page_size == 0 {
            return Err(Error::Config("Provider page size must be positive".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of an address's history
    pub fn fetch_page(&self, address: &str, offset: u64, limit: u64) -> Result<RawAddrPage> {
        let url = format!("{}/rawaddr/{}", self.base_url, address);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(address, status, &body));
        }

        let page: RawAddrPage = response.json()?;
        Ok(page)
    }

    /// Fetch everything past `offset`
    pub fn fetch_history(&self, address: &str, offset: u64) -> Result<AddressData> {
        collect_history(address, offset, self.page_size, |offset, limit| {
            self.fetch_page(address, offset, limit)
        })
    }
}

/// Map a failed response to a provider error
///
/// Only a 404 whose JSON body says the address is unknown means "no
/// history". Any other 404 (a wrong base URL, a proxy page) is an outage,
/// otherwise a misconfigured provider would track every address at zero.
fn status_error(address: &str, status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::NOT_FOUND if reports_unknown_address(body) => {
            Error::not_found(format!("address {} unknown to provider", address))
        }
        StatusCode::NOT_FOUND => Error::provider("blockchain.info API error: HTTP 404 (not an address lookup)"),
        StatusCode::TOO_MANY_REQUESTS => Error::provider("blockchain.info rate limit exceeded"),
        status => Error::provider(format!("blockchain.info API error: HTTP {}", status.as_u16())),
    }
}

fn reports_unknown_address(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    ["error", "message"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(|msg| msg.to_ascii_lowercase())
        .any(|msg| msg.contains("address") && (msg.contains("not found") || msg.contains("unknown")))
}

// =============================================================================
// BlockchainProvider - implements ChainDataProvider trait
// =============================================================================

/// Live chain data provider backed by blockchain.info
pub struct BlockchainProvider {
    client: BlockchainClient,
}

impl BlockchainProvider {
    pub fn new(client: BlockchainClient) -> Self {
        Self { client }
    }
}

impl ChainDataProvider for BlockchainProvider {
    fn name(&self) -> &str {
        "blockchain"
    }

    fn fetch(&self, address: &str, offset: u64) -> Result<AddressData> {
        self.client.fetch_history(address, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::blockchain_mock::{MockBlockchainServer, MockConfig};
    use crate::domain::Transaction;

    const ADDR: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn txs(n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| Transaction::new(format!("tx{:03}", i), 700_000 + i as u32, 1_000))
            .collect()
    }

    fn client_for(server: &MockBlockchainServer, page_size: u64) -> BlockchainClient {
        BlockchainClient::with_options(&server.base_url(), page_size, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_reject_invalid_url() {
        let result = BlockchainClient::with_options("not a url", 100, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_reject_non_http_scheme() {
        let result = BlockchainClient::with_options("ftp://blockchain.info", 100, Duration::from_secs(1));
        assert!(result.unwrap_err().to_string().contains("http"));
    }

    #[test]
    fn test_reject_zero_page_size() {
        let result = BlockchainClient::with_options(BLOCKCHAIN_PRODUCTION_URL, 0, Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            BlockchainClient::with_options("https://blockchain.info/", 100, Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "https://blockchain.info");
    }

    #[test]
    fn test_fetch_pages_through_history() {
        let server = MockBlockchainServer::start(MockConfig::default()).unwrap();
        server.set_history(ADDR, 25_000, txs(25));

        let provider = BlockchainProvider::new(client_for(&server, 10));
        let data = provider.fetch(ADDR, 0).unwrap();

        assert_eq!(data.balance, 25_000);
        assert_eq!(data.transactions.len(), 25);
        assert_eq!(data.transactions[24].hash, "tx024");
        assert_eq!(server.requested_offsets(ADDR), vec![0, 10, 20, 25]);
    }

    #[test]
    fn test_fetch_from_offset_returns_remainder() {
        let server = MockBlockchainServer::start(MockConfig::default()).unwrap();
        server.set_history(ADDR, 12_000, txs(12));

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let data = provider.fetch(ADDR, 10).unwrap();

        let hashes: Vec<_> = data.transactions.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["tx010", "tx011"]);
        assert_eq!(data.balance, 12_000);
    }

    #[test]
    fn test_server_page_cap_does_not_drop_transactions() {
        let config = MockConfig {
            max_limit: 7,
            ..MockConfig::default()
        };
        let server = MockBlockchainServer::start(config).unwrap();
        server.set_history(ADDR, 1, txs(15));

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let data = provider.fetch(ADDR, 0).unwrap();

        assert_eq!(data.transactions.len(), 15);
        assert_eq!(server.requested_offsets(ADDR), vec![0, 7, 14, 15]);
    }

    #[test]
    fn test_unknown_address_is_empty_history() {
        let server = MockBlockchainServer::start(MockConfig::default()).unwrap();

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let data = provider.fetch(ADDR, 0).unwrap();

        assert_eq!(data, AddressData::empty(ADDR));
    }

    #[test]
    fn test_html_not_found_is_provider_unavailable() {
        let config = MockConfig {
            html_not_found: true,
            ..MockConfig::default()
        };
        let server = MockBlockchainServer::start(config).unwrap();

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let err = provider.fetch(ADDR, 0).unwrap_err();

        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }

    #[test]
    fn test_wrong_base_path_is_provider_unavailable() {
        let server = MockBlockchainServer::start(MockConfig::default()).unwrap();
        server.set_history(ADDR, 1, txs(1));

        let client =
            BlockchainClient::with_options(&format!("{}/api", server.base_url()), 100, Duration::from_secs(5))
                .unwrap();
        let err = BlockchainProvider::new(client).fetch(ADDR, 0).unwrap_err();

        assert!(matches!(err, Error::ProviderUnavailable(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_reports_unknown_address() {
        assert!(reports_unknown_address(r#"{"error": "Address not found"}"#));
        assert!(reports_unknown_address(r#"{"message": "Unknown address"}"#));
        assert!(!reports_unknown_address(r#"{"error": "Endpoint not found"}"#));
        assert!(!reports_unknown_address("<html>Address not found</html>"));
        assert!(!reports_unknown_address(""));
    }

    #[test]
    fn test_server_error_is_provider_unavailable() {
        let config = MockConfig {
            fail_status: Some(500),
            ..MockConfig::default()
        };
        let server = MockBlockchainServer::start(config).unwrap();
        server.set_history(ADDR, 1, txs(1));

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let err = provider.fetch(ADDR, 0).unwrap_err();

        assert!(matches!(err, Error::ProviderUnavailable(_)));
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn test_rate_limit_is_provider_unavailable() {
        let config = MockConfig {
            fail_status: Some(429),
            ..MockConfig::default()
        };
        let server = MockBlockchainServer::start(config).unwrap();

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let err = provider.fetch(ADDR, 0).unwrap_err();

        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_undecodable_body_is_provider_unavailable() {
        let config = MockConfig {
            malformed_body: true,
            ..MockConfig::default()
        };
        let server = MockBlockchainServer::start(config).unwrap();
        server.set_history(ADDR, 1, txs(1));

        let provider = BlockchainProvider::new(client_for(&server, 100));
        let err = provider.fetch(ADDR, 0).unwrap_err();

        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }

    #[test]
    fn test_connection_refused_is_provider_unavailable() {
        let server = MockBlockchainServer::start(MockConfig::default()).unwrap();
        let base_url = server.base_url();
        drop(server);

        let client = BlockchainClient::with_options(&base_url, 100, Duration::from_secs(2)).unwrap();
        let err = BlockchainProvider::new(client).fetch(ADDR, 0).unwrap_err();

        assert!(matches!(err, Error::ProviderUnavailable(_)));
    }
}
