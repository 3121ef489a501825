use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlmigrate_common::{Error, Result};

pub const DEFAULT_TABLE: &str = "migrations";

/// Settings for opening a database and locating its migration scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub database_path: PathBuf,
    pub migrations_dir: PathBuf,
    /// Only files with this extension are read from `migrations_dir`.
    /// `None` reads every regular file.
    pub extension: Option<String>,
    /// Name of the ledger table.
    pub table: String,
    pub journal_mode: Option<String>,
    pub foreign_keys: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data.db"),
            migrations_dir: PathBuf::from("migrations"),
            extension: None,
            table: DEFAULT_TABLE.to_string(),
            journal_mode: None,
            foreign_keys: true,
        }
    }
}

impl MigrateConfig {
    /// The ledger table name and journal mode are interpolated into SQL, so
    /// both must be plain identifiers.
    pub fn validate(&self) -> Result<()> {
        let table = &self.table;
        if !is_identifier(table) {
            return Err(Error::Config(format!("invalid migrations table name: {table:?}")));
        }
        if let Some(mode) = &self.journal_mode {
            if !is_identifier(mode) {
                return Err(Error::Config(format!("invalid journal_mode: {mode:?}")));
            }
        }
        if let Some(ext) = &self.extension {
            if ext.is_empty() || ext.contains('/') {
                return Err(Error::Config(format!("invalid extension: {ext:?}")));
            }
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MigrateConfig::default();
        assert_eq!(config.table, "migrations");
        assert!(config.foreign_keys);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_table_names_that_are_not_identifiers() {
        for bad in ["", "1abc", "mig rations", "m;DROP TABLE x", "schema.table"] {
            let config = MigrateConfig {
                table: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn rejects_bad_journal_mode_and_extension() {
        let config = MigrateConfig {
            journal_mode: Some("WAL; DROP".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MigrateConfig {
            extension: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("schema_migrations"));
        assert!(is_identifier("_m2"));
        assert!(!is_identifier("m-2"));
    }
}
