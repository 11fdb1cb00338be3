//! Caller-scoped transaction around one unit of work.
//!
//! The engine itself never begins or ends transactions. Callers that want
//! the all-or-nothing guarantee for one `save`/`delete` run it here.

use super::DbError;
use crate::access::SqliteDataAccessStrategy;
use log::{debug, error, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Begin or commit of a caller-scoped transaction failed.
#[derive(Debug)]
pub struct TransactionError {
    /// `begin` or `commit`.
    pub stage: &'static str,
    pub source: DbError,
}

impl Display for TransactionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "transaction {} failed: {}", self.stage, self.source)
    }
}

impl Error for TransactionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

impl TransactionError {
    fn at(stage: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |err| Self {
            stage,
            source: DbError::from(err),
        }
    }
}

/// Runs `work` inside an immediate transaction.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`.
/// Begin and commit failures are converted into the caller's error type.
/// When `work` fails, its error is returned even if the rollback fails too;
/// the rollback failure is logged.
pub fn with_transaction<T, E, F>(conn: &mut Connection, work: F) -> Result<T, E>
where
    E: From<TransactionError>,
    F: FnOnce(&SqliteDataAccessStrategy<'_>) -> Result<T, E>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(TransactionError::at("begin"))?;

    let outcome = {
        let strategy = SqliteDataAccessStrategy::new(&tx);
        work(&strategy)
    };

    match outcome {
        Ok(value) => {
            tx.commit().map_err(TransactionError::at("commit"))?;
            debug!("event=tx_end module=db status=ok outcome=commit");
            Ok(value)
        }
        Err(err) => {
            match tx.rollback() {
                Ok(()) => warn!("event=tx_end module=db status=error outcome=rollback"),
                Err(rollback_err) => error!(
                    "event=tx_end module=db status=error outcome=rollback_failed error={}",
                    rollback_err
                ),
            }
            Err(err)
        }
    }
}
