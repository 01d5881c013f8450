//! SQLite storage bootstrap, schema description and unit-of-work scoping.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the catalog.
//! - Apply schema migrations in deterministic order.
//! - Offer callers a transactional scope to run repository calls in.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Repositories must not touch application data before migrations succeed.
//! - Repositories never begin or commit transactions themselves; atomic
//!   multi-statement steps use savepoints so they nest inside a caller scope.

use log::warn;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory, open_db_with, DEFAULT_BUSY_TIMEOUT_MS};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
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
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Runs `work` inside one IMMEDIATE transaction.
///
/// Commits when `work` returns `Ok`; rolls back on `Err`, leaving no partial
/// mutation visible. The closure receives the transaction as a plain
/// connection so repositories can be built on it.
pub fn unit_of_work<T, E, F>(conn: &mut Connection, work: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<DbError>,
{
    let tx = Transaction::new(conn, TransactionBehavior::Immediate).map_err(DbError::from)?;
    let value = work(&tx)?;
    tx.commit().map_err(DbError::from)?;
    Ok(value)
}

/// Runs `work` inside a named savepoint on a shared connection.
///
/// Works both inside and outside a caller-owned transaction. On `Err` the
/// savepoint is rolled back and released, and the error from `work` is
/// returned even when the rollback itself fails.
pub(crate) fn with_savepoint<T, E, F>(conn: &Connection, name: &str, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<DbError>,
{
    conn.execute_batch(&format!("SAVEPOINT {name};"))
        .map_err(DbError::from)?;
    match work() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {name};"))
                .map_err(DbError::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
            {
                warn!(
                    "event=savepoint_rollback module=db status=error savepoint={name} error={rollback_err}"
                );
            }
            Err(err)
        }
    }
}
