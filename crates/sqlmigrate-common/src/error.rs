use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not open database {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not create migrations table {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not read migrations from {location}: {reason}")]
    SourceRead { location: String, reason: String },

    #[error("could not begin transaction for migration {name}: {source}")]
    Transaction {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not execute migration {name}: {source}")]
    Apply {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not set migration {name} as executed: {source}")]
    Record {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration {name} is already recorded as executed")]
    DuplicateRecord { name: String },

    #[error("could not query migrations table: {source}")]
    Query {
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not commit migration {name}: {source}")]
    Commit {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not roll back migration {name} after failure ({cause}): {source}")]
    Rollback {
        name: String,
        cause: Box<Error>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Name of the migration unit the error is attributed to, if any.
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            Error::Transaction { name, .. }
            | Error::Apply { name, .. }
            | Error::Record { name, .. }
            | Error::DuplicateRecord { name }
            | Error::Commit { name, .. }
            | Error::Rollback { name, .. } => Some(name),
            _ => None,
        }
    }
}
