use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, params};
use sqlmigrate_common::{Error, Result};
use sqlmigrate_config::model::{DEFAULT_TABLE, is_identifier};
use tracing::debug;

use crate::migrations::MigrationRecord;

/// Bookkeeping table recording which migrations have run.
///
/// Every method takes the connection explicitly. Pass a `Transaction`
/// (it derefs to `Connection`) to keep the check and the insert inside the
/// same transaction as the migration body.
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl Ledger {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(Error::Config(format!("invalid migrations table name: {table:?}")));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist. Safe to call on every run.
    ///
    /// The unique index also covers tables created before `name` carried a
    /// `UNIQUE` constraint.
    pub fn ensure_schema(&self, conn: &Connection) -> Result<()> {
        let table = &self.table;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id   INTEGER NOT NULL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                time INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {table}_name_idx ON {table} (name);"
        ))
        .map_err(|source| Error::Schema {
            table: table.clone(),
            source,
        })?;
        debug!("migrations table {table} ready");
        Ok(())
    }

    pub fn is_applied(&self, conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(1) FROM {} WHERE name = ?1", self.table),
                params![name],
                |row| row.get(0),
            )
            .map_err(|source| Error::Query { source })?;
        Ok(count > 0)
    }

    pub fn record_applied(&self, conn: &Connection, name: &str, at: DateTime<Utc>) -> Result<()> {
        conn.execute(
            &format!("INSERT INTO {} (name, time) VALUES (?1, ?2)", self.table),
            params![name, at.timestamp()],
        )
        .map_err(|source| match source {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::DuplicateRecord {
                    name: name.to_string(),
                }
            }
            source => Error::Record {
                name: name.to_string(),
                source,
            },
        })?;
        Ok(())
    }

    /// All records, in the order they were applied.
    pub fn applied(&self, conn: &Connection) -> Result<Vec<MigrationRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, name, time FROM {} ORDER BY id ASC",
                self.table
            ))
            .map_err(|source| Error::Query { source })?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MigrationRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    applied_at: from_unix(row.get(2)?)?,
                })
            })
            .map_err(|source| Error::Query { source })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|source| Error::Query { source })
    }
}

fn from_unix(secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(2, secs))
}
