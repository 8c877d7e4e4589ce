//! Doctor service - ledger health checks

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::migrations::MIGRATIONS;
use crate::ports::LedgerStore;

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();

        // Transactions left behind by an interrupted remove
        let orphans = self.repository.orphaned_transactions()?;
        checks.insert(
            "orphaned_transactions".to_string(),
            if orphans.is_empty() {
                CheckResult::pass("No orphaned transactions found")
            } else {
                CheckResult::error(
                    format!("{} transaction(s) reference untracked addresses", orphans.len()),
                    orphans
                        .iter()
                        .map(|(hash, address)| json!({ "hash": hash, "address": address }))
                        .collect(),
                )
            },
        );

        let ownerless = self.repository.ownerless_addresses()?;
        checks.insert(
            "ownerless_addresses".to_string(),
            if ownerless.is_empty() {
                CheckResult::pass("Every tracked address has an owner")
            } else {
                CheckResult::error(
                    format!("{} address(es) reference missing accounts", ownerless.len()),
                    ownerless
                        .iter()
                        .map(|(address, owner)| json!({ "address": address, "owner": owner }))
                        .collect(),
                )
            },
        );

        let applied = self.repository.applied_migrations()?;
        let pending: Vec<_> = MIGRATIONS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !applied.iter().any(|a| a == name))
            .collect();
        checks.insert(
            "schema".to_string(),
            if pending.is_empty() {
                CheckResult::pass(format!("All {} migration(s) applied", MIGRATIONS.len()))
            } else {
                CheckResult::warning(
                    format!("{} migration(s) pending", pending.len()),
                    pending.iter().map(|name| json!({ "migration": name })).collect(),
                )
            },
        );

        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary {
                passed,
                warnings,
                errors,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

impl DoctorResult {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            status: "pass".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warning(message: impl Into<String>, details: Vec<serde_json::Value>) -> Self {
        Self {
            status: "warning".to_string(),
            message: message.into(),
            details: Some(details),
        }
    }

    fn error(message: impl Into<String>, details: Vec<serde_json::Value>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
