pub mod comments;
pub mod common;
pub mod config;
pub mod error;
pub mod groups;
pub mod migrations;
mod models;
pub mod notes;
pub mod password;
pub mod roles;
pub mod subscriptions;
pub mod topics;
pub mod users;
pub mod votes;

pub use error::{DbError, ErrorKind, Result};
pub use migrations::MODEL_VERSION;

use chrono::{DateTime, Utc};
use rusqlite::types::FromSql;
use rusqlite::{Connection, OptionalExtension, Params, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

/// Handle to the forum store. One connection behind a mutex; every
/// operation is a short unit of work against it.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // Other processes may hold the write lock briefly
        conn.busy_timeout(Duration::from_secs(5))?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory store, gone when the handle drops.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back otherwise.
    ///
    /// The write lock is taken at `BEGIN`, so the reads `f` makes before
    /// writing see the same snapshot the writes land on. A writer on another
    /// connection makes this wait for the busy timeout instead of failing
    /// mid-transaction.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::Internal(format!("DB lock poisoned: {}", e)))
    }

    /// Single-value read for optional enrichment. Missing rows and store
    /// faults both degrade to `T::default()`.
    pub(crate) fn read_or_default<T, P>(&self, sql: &str, params: P) -> T
    where
        T: FromSql + Default,
        P: Params,
    {
        let result = self.with_conn(|conn| {
            Ok(conn.query_row(sql, params, |row| row.get(0)).optional()?)
        });
        match result {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!("Enrichment read failed, using default: {}", e);
                T::default()
            }
        }
    }

    pub(crate) fn count(&self, sql: &str) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
    }
}

pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
