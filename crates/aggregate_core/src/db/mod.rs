//! SQLite connection bootstrap, schema scripts and transaction scope.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the aggregate store.
//! - Apply caller-owned schema scripts in deterministic order.
//! - Wrap one engine call in a caller-scoped transaction.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Returned connections have `foreign_keys=ON`.
//! - Engine calls must not touch tables before the schema is applied.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod transaction;

pub use migrations::Migration;
pub use open::{open_db, open_db_in_memory, open_with_config};
pub use transaction::{with_transaction, TransactionError};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    NonMonotonicSchema {
        previous: u32,
        version: u32,
    },
    InvalidIdentifier(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::NonMonotonicSchema { previous, version } => write!(
                f,
                "schema script version {version} must be greater than {previous}"
            ),
            Self::InvalidIdentifier(name) => {
                write!(f, "`{name}` is not a valid table or column name")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::NonMonotonicSchema { .. } => None,
            Self::InvalidIdentifier(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
