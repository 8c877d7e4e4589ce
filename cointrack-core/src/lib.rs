//! Cointrack Core - incremental address tracking and sync
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: entities (Address, Transaction, Account) and sync outcomes
//! - **ports**: traits for collaborators (LedgerStore, ChainDataProvider)
//! - **services**: orchestration (sync engine, account gateway, doctor, logging)
//! - **adapters**: DuckDB store, blockchain.info client, fixture provider

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use adapters::blockchain::{BlockchainClient, BlockchainProvider};
use adapters::duckdb::DuckDbRepository;
use adapters::fixture::FixtureProvider;
use config::{Config, ProviderKind};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    Account, AddOutcome, Address, AddressData, RefreshOutcome, RemoveOutcome, ResyncOutcome,
    StoredTransaction, Transaction,
};
pub use ports::{ChainDataProvider, LedgerStore};
pub use services::{AccountSummary, EntryPoint, LogEntry, LogEvent, LoggingService};

/// Main context for Cointrack operations
///
/// Composition root: opens the ledger, runs migrations, builds the
/// configured provider and wires the services together.
pub struct CointrackContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub provider: Arc<dyn ChainDataProvider>,
    pub sync_service: Arc<SyncService>,
    pub account_service: AccountService,
    pub summary_service: SummaryService,
    pub doctor_service: DoctorService,
}

impl CointrackContext {
    /// Create a context for the data directory, using the configured provider
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let provider = build_provider(&config, data_dir)?;
        Self::with_provider(data_dir, config, provider)
    }

    /// Create a context with an explicit provider
    pub fn with_provider(
        data_dir: &Path,
        config: Config,
        provider: Arc<dyn ChainDataProvider>,
    ) -> Result<Self> {
        let db_path = Config::db_path(data_dir);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open ledger {}", db_path.display()))?,
        );
        repository.ensure_schema()?;

        let store: Arc<dyn LedgerStore> = repository.clone();
        let sync_service = Arc::new(SyncService::new(Arc::clone(&store), Arc::clone(&provider)));
        let account_service = AccountService::new(Arc::clone(&store), Arc::clone(&sync_service))?;
        let summary_service = SummaryService::new(Arc::clone(&store));
        let doctor_service = DoctorService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            provider,
            sync_service,
            account_service,
            summary_service,
            doctor_service,
        })
    }
}

/// Build the chain data provider named by the config
pub fn build_provider(config: &Config, data_dir: &Path) -> Result<Arc<dyn ChainDataProvider>> {
    let settings = &config.provider;
    match settings.kind {
        ProviderKind::Blockchain => {
            let client = BlockchainClient::with_options(
                &settings.base_url,
                settings.page_size,
                Duration::from_secs(settings.timeout_secs),
            )?;
            Ok(Arc::new(BlockchainProvider::new(client)))
        }
        ProviderKind::Fixture => {
            let dir = config.fixture_dir(data_dir);
            let provider = FixtureProvider::from_dir(&dir)?.with_page_size(settings.page_size);
            Ok(Arc::new(provider))
        }
    }
}
