//! Exactly-once schema migrations for SQLite.
//!
//! A [`Runner`] reads [`MigrationUnit`]s from a [`MigrationSource`], sorts
//! them by name, and applies each unrecorded unit inside its own
//! transaction, recording it in the [`Ledger`] before committing.

pub mod ledger;
pub mod migrations;
pub mod runner;
pub mod source;
pub mod store;

pub use ledger::Ledger;
pub use migrations::{MigrationRecord, MigrationUnit};
pub use runner::{RunReport, Runner};
pub use source::{DirectorySource, EmbeddedSource, MemorySource, MigrationSource};
pub use store::{connect, init, init_in_memory, init_with_config};
