//! Configuration management
//!
//! Reads `settings.json` from the data directory:
//! ```json
//! {
//!   "provider": {
//!     "kind": "blockchain",
//!     "baseUrl": "https://blockchain.info",
//!     "pageSize": 100,
//!     "timeoutSecs": 10,
//!     "fixtureDir": null
//!   }
//! }
//! ```
//! Keys this crate does not know are ignored. `COINTRACK_PROVIDER`,
//! `COINTRACK_BASE_URL` and `COINTRACK_FIXTURE_DIR` override the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::blockchain::{BLOCKCHAIN_PRODUCTION_URL, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS};

/// Ledger database file name inside the data directory
pub const DB_FILENAME: &str = "cointrack.duckdb";

/// Which chain data provider to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Blockchain,
    Fixture,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "blockchain" | "blockchain.info" => Ok(Self::Blockchain),
            "fixture" | "fixtures" => Ok(Self::Fixture),
            other => Err(anyhow!(
                "Unknown provider '{}' (expected 'blockchain' or 'fixture')",
                other
            )),
        }
    }
}

/// Provider section of settings.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fixture_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    BLOCKCHAIN_PRODUCTION_URL.to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_base_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            fixture_dir: None,
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    provider: ProviderSettings,
    #[serde(flatten)]
    #[allow(dead_code)]
    other: HashMap<String, serde_json::Value>,
}

/// Cointrack configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub provider: ProviderSettings,
}

impl Config {
    /// Load config from the data directory, then apply env overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let mut config = Self {
            provider: raw.provider,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.resolve_paths(data_dir);
        Ok(config)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(kind) = var("COINTRACK_PROVIDER") {
            self.provider.kind = kind.parse()?;
        }
        if let Some(url) = var("COINTRACK_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(dir) = var("COINTRACK_FIXTURE_DIR") {
            self.provider.fixture_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Relative fixture directories are relative to the data directory
    fn resolve_paths(&mut self, data_dir: &Path) {
        if let Some(dir) = &self.provider.fixture_dir {
            if dir.is_relative() {
                self.provider.fixture_dir = Some(data_dir.join(dir));
            }
        }
    }

    /// Fixture directory, defaulting to `<data_dir>/fixtures`
    pub fn fixture_dir(&self, data_dir: &Path) -> PathBuf {
        self.provider
            .fixture_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("fixtures"))
    }

    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DB_FILENAME)
    }
}
