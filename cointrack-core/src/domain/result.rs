//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Idempotence signals (already tracked, not tracked, no change) are not
/// errors; they live in the sync outcome enums instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport or decoding failure talking to the chain data provider
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence layer failure
    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// True for entity-absent errors, which callers treat as a normal branch
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::ProviderUnavailable(format!("request timed out: {}", e))
        } else if e.is_connect() {
            Self::ProviderUnavailable(format!("unable to connect: {}", e))
        } else if e.is_decode() {
            Self::ProviderUnavailable(format!("failed to decode response: {}", e))
        } else {
            Self::ProviderUnavailable(e.to_string())
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON batch reporting)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context entry (e.g. the address a batch item refers to)
    pub fn with_context(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.into());
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}
