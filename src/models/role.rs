//! Role and wildcard-permission reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named capability attached to an account for role-based authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub date_created: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            date_created: Utc::now(),
        }
    }
}

/// Capability string in wildcard format, e.g. `admin:*` or
/// `printer:query,delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub wildcard: String,
    pub date_created: DateTime<Utc>,
}

impl Permission {
    pub fn new(wildcard: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            wildcard: wildcard.into(),
            date_created: Utc::now(),
        }
    }
}
