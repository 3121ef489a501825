use std::path::Path;

use rusqlite::Connection;
use sqlmigrate_common::{Error, Result};
use sqlmigrate_config::MigrateConfig;
use tracing::{info, warn};

use crate::ledger::Ledger;
use crate::runner::{RunReport, Runner};
use crate::source::{DirectorySource, MigrationSource};

/// Open the database at `path` and bring it up to date with `source`.
///
/// Returns a connection with every migration applied, or the first error.
/// On error the connection is closed before returning.
pub fn init(path: &Path, source: &dyn MigrationSource) -> Result<Connection> {
    info!("opening database at {}", path.display());
    let conn = Connection::open(path).map_err(|source| Error::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    migrate(conn, path, &Runner::new(source))
}

pub fn init_in_memory(source: &dyn MigrationSource) -> Result<Connection> {
    let path = Path::new(":memory:");
    let conn = Connection::open_in_memory().map_err(|source| Error::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    migrate(conn, path, &Runner::new(source))
}

/// Open the configured database and apply migrations from the configured
/// directory into the configured ledger table.
pub fn init_with_config(config: &MigrateConfig) -> Result<(Connection, RunReport)> {
    let mut conn = connect(config)?;

    let source = DirectorySource::from_config(config);
    let runner = Runner::new(&source).with_ledger(Ledger::new(config.table.clone())?);

    match runner.run(&mut conn) {
        Ok(report) => Ok((conn, report)),
        Err(e) => {
            warn!(
                "closing {} after failed migration run",
                config.database_path.display()
            );
            Err(e)
        }
    }
}

/// Open the configured database and apply its pragmas, without migrating.
pub fn connect(config: &MigrateConfig) -> Result<Connection> {
    config.validate()?;
    let path = &config.database_path;
    info!("opening database at {}", path.display());

    let conn = Connection::open(path).map_err(|source| Error::Connection {
        path: path.clone(),
        source,
    })?;

    if let Some(mode) = &config.journal_mode {
        let actual: String = conn
            .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
            .map_err(|source| Error::Connection {
                path: path.clone(),
                source,
            })?;
        if !actual.eq_ignore_ascii_case(mode) {
            warn!("requested journal_mode {mode}, database reports {actual}");
        }
    }
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(|source| Error::Connection {
            path: path.clone(),
            source,
        })?;

    Ok(conn)
}

fn migrate(mut conn: Connection, path: &Path, runner: &Runner<'_>) -> Result<Connection> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(|source| Error::Connection {
            path: path.to_path_buf(),
            source,
        })?;

    match runner.run(&mut conn) {
        Ok(_) => Ok(conn),
        Err(e) => {
            warn!("closing {} after failed migration run", path.display());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn init_in_memory_returns_migrated_connection() {
        let source = MemorySource::new()
            .with("0001_init.sql", "CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .with("0002_seed.sql", "INSERT INTO t (id) VALUES (7);");

        let conn = init_in_memory(&source).unwrap();
        let id: i64 = conn.query_row("SELECT id FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(id, 7);
    }

    #[test]
    fn init_in_memory_enables_foreign_keys() {
        let conn = init_in_memory(&MemorySource::new()).unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }

    #[test]
    fn init_reports_the_failing_migration() {
        let source = MemorySource::new().with("0001_bad.sql", "CREATE TABLE (;");
        let err = init_in_memory(&source).unwrap_err();
        assert_eq!(err.migration_name(), Some("0001_bad.sql"));
    }

    #[test]
    fn connect_applies_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let config = MigrateConfig {
            database_path: dir.path().join("app.db"),
            journal_mode: Some("WAL".into()),
            foreign_keys: false,
            ..Default::default()
        };

        let conn = connect(&config).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        let fk: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(!fk);
    }

    #[test]
    fn connect_rejects_invalid_config() {
        let config = MigrateConfig {
            table: "not valid".into(),
            ..Default::default()
        };
        assert!(matches!(connect(&config), Err(Error::Config(_))));
    }

    #[test]
    fn open_failure_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.db");
        let err = init(&path, &MemorySource::new()).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
