//! Connection bootstrap utilities for SQLite.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have the caller's schema fully applied.

use super::migrations::{apply_migrations, Migration};
use super::DbResult;
use crate::config::StoreConfig;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies pending schema scripts.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, schema: &[Migration]) -> DbResult<Connection> {
    open_logged(
        "file",
        || Connection::open(path),
        DEFAULT_BUSY_TIMEOUT,
        schema,
    )
}

/// Opens an in-memory SQLite database and applies the schema scripts.
pub fn open_db_in_memory(schema: &[Migration]) -> DbResult<Connection> {
    open_logged(
        "memory",
        Connection::open_in_memory,
        DEFAULT_BUSY_TIMEOUT,
        schema,
    )
}

/// Opens the database described by `config`.
///
/// A config without `db_path` yields an in-memory database.
pub fn open_with_config(config: &StoreConfig, schema: &[Migration]) -> DbResult<Connection> {
    let busy_timeout = config.busy_timeout();
    match config.db_path.as_deref() {
        Some(path) => open_logged("file", || Connection::open(path), busy_timeout, schema),
        None => open_logged("memory", Connection::open_in_memory, busy_timeout, schema),
    }
}

fn open_logged(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
    busy_timeout: Duration,
    schema: &[Migration],
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, busy_timeout, schema) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    busy_timeout: Duration,
    schema: &[Migration],
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn, schema)?;
    Ok(())
}
