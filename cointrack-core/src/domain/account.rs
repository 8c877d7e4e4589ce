//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account, the ownership anchor for tracked addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    /// Argon2 PHC string; never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let account = Account::new("satoshi", "$argon2id$v=19$secret");
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("satoshi"));
        assert!(!json.contains("argon2id"));
    }
}
