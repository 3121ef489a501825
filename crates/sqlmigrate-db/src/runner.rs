use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use sqlmigrate_common::{Error, Result};
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::migrations::MigrationUnit;
use crate::source::MigrationSource;

/// Names of the units a run executed and the ones it found already recorded,
/// both in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

enum Outcome {
    Applied,
    Skipped,
}

/// Applies pending migrations from a source, one transaction per unit.
pub struct Runner<'a> {
    source: &'a dyn MigrationSource,
    ledger: Ledger,
}

impl<'a> Runner<'a> {
    pub fn new(source: &'a dyn MigrationSource) -> Self {
        Self {
            source,
            ledger: Ledger::default(),
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every unit not yet in the ledger, in byte-wise name order.
    ///
    /// Stops at the first failure. Units before it stay committed; the
    /// failing unit leaves no trace in the schema or the ledger.
    pub fn run(&self, conn: &mut Connection) -> Result<RunReport> {
        self.ledger.ensure_schema(conn)?;
        let units = self.sorted_units()?;
        info!(
            "running {} migration(s) from {}",
            units.len(),
            self.source.describe()
        );

        let mut report = RunReport::default();
        for unit in units {
            match self.apply_unit(conn, &unit) {
                Ok(Outcome::Applied) => {
                    info!("applied migration {}", unit.name);
                    report.applied.push(unit.name);
                }
                Ok(Outcome::Skipped) => {
                    debug!("migration {} already applied", unit.name);
                    report.skipped.push(unit.name);
                }
                Err(e) => {
                    warn!("migration {} failed, aborting run: {e}", unit.name);
                    return Err(e);
                }
            }
        }

        info!(
            "migrations complete: {} applied, {} already up to date",
            report.applied.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Names of units that [`Runner::run`] would apply, without applying them.
    pub fn pending(&self, conn: &Connection) -> Result<Vec<String>> {
        self.ledger.ensure_schema(conn)?;
        let mut pending = Vec::new();
        for unit in self.sorted_units()? {
            if !self.ledger.is_applied(conn, &unit.name)? {
                pending.push(unit.name);
            }
        }
        Ok(pending)
    }

    fn sorted_units(&self) -> Result<Vec<MigrationUnit>> {
        let mut units = self.source.units()?;
        // `String` ordering is byte-wise.
        units.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(pair) = units.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(Error::SourceRead {
                location: self.source.describe(),
                reason: format!("duplicate migration name {}", pair[0].name),
            });
        }
        Ok(units)
    }

    fn apply_unit(&self, conn: &mut Connection, unit: &MigrationUnit) -> Result<Outcome> {
        in_transaction(conn, &unit.name, |tx| {
            if self.ledger.is_applied(tx, &unit.name)? {
                return Ok(Outcome::Skipped);
            }

            debug!("executing migration {}", unit.name);
            tx.execute_batch(&unit.body).map_err(|source| Error::Apply {
                name: unit.name.clone(),
                source,
            })?;
            if tx.is_autocommit() {
                return Err(Error::Apply {
                    name: unit.name.clone(),
                    source: ended_transaction(),
                });
            }
            self.ledger.record_applied(tx, &unit.name, Utc::now())?;
            Ok(Outcome::Applied)
        })
    }
}

/// The body ran its own `COMMIT`/`ROLLBACK`, so whatever it did before that
/// is outside the unit's transaction.
fn ended_transaction() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
        Some("migration body ended its enclosing transaction".to_string()),
    )
}

/// Run `body` in an immediate transaction, committing on success and rolling
/// back exactly once on any failure.
fn in_transaction<T>(
    conn: &mut Connection,
    name: &str,
    body: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|source| Error::Transaction {
            name: name.to_string(),
            source,
        })?;

    match body(&tx) {
        // A transaction that fails to commit is rolled back when dropped.
        Ok(value) => tx.commit().map(|()| value).map_err(|source| Error::Commit {
            name: name.to_string(),
            source,
        }),
        // SQLite already rolled back (RAISE(ROLLBACK), SQLITE_FULL, ...).
        Err(cause) if tx.is_autocommit() => Err(cause),
        Err(cause) => match tx.rollback() {
            Ok(()) => Err(cause),
            Err(source) => Err(Error::Rollback {
                name: name.to_string(),
                cause: Box::new(cause),
                source,
            }),
        },
    }
}
