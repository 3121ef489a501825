use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named script waiting to be applied.
///
/// Units are built fresh from a source on every run and never stored;
/// only their names end up in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    pub name: String,
    pub body: String,
}

impl MigrationUnit {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// A row of the ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}
