use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use rusqlite::Connection;

use crate::backend::{Connector, Preparer};
use crate::error::SqlModelError;

use super::prepared::SqlitePreparedStatement;
use super::transaction::SqliteTx;

/// Compiled statements kept by rusqlite's per connection cache. Its own
/// default of 16 is below the number of field-set combinations a few
/// tables reach.
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 256;

/// A shared `SQLite` connection.
///
/// Calls are serialized on one connection. An open [`SqliteTx`] holds the
/// connection until it finishes. Callers on other threads wait for it;
/// calls from the thread that owns the transaction fail with
/// [`SqlModelError::TransactionError`] instead of blocking forever.
#[derive(Clone)]
pub struct SqliteConnector {
    conn: Arc<Mutex<Connection>>,
    tx_thread: Arc<Mutex<Option<ThreadId>>>,
    statement_cache_capacity: Arc<AtomicUsize>,
}

impl fmt::Debug for SqliteConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnector")
            .field("statement_cache_capacity", &self.statement_cache_capacity())
            .finish_non_exhaustive()
    }
}

impl SqliteConnector {
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(DEFAULT_STATEMENT_CACHE_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            tx_thread: Arc::new(Mutex::new(None)),
            statement_cache_capacity: Arc::new(AtomicUsize::new(DEFAULT_STATEMENT_CACHE_CAPACITY)),
        }
    }

    /// Open a database file, switching it to WAL journaling.
    ///
    /// # Errors
    /// Returns the rusqlite error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqlModelError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(Self::from_connection(conn))
    }

    /// # Errors
    /// Returns the rusqlite error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, SqlModelError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Number of compiled statements the connection keeps. A statement
    /// evicted from it is compiled again on its next use.
    #[must_use]
    pub fn statement_cache_capacity(&self) -> usize {
        self.statement_cache_capacity.load(Ordering::Relaxed)
    }

    /// # Errors
    /// Returns [`SqlModelError::TransactionError`] when called from the
    /// thread holding an open transaction.
    pub fn set_statement_cache_capacity(&self, capacity: usize) -> Result<(), SqlModelError> {
        self.lock()?.set_prepared_statement_cache_capacity(capacity);
        self.statement_cache_capacity.store(capacity, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqlModelError> {
        let current = thread::current().id();
        if *self.tx_thread.lock().unwrap_or_else(PoisonError::into_inner) == Some(current) {
            return Err(SqlModelError::TransactionError(
                "connection is held by a transaction on this thread".into(),
            ));
        }
        Ok(self.conn.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn set_tx_thread(&self, owner: Option<ThreadId>) {
        *self.tx_thread.lock().unwrap_or_else(PoisonError::into_inner) = owner;
    }

    /// Run one or more `;` separated statements without parameters, e.g. a
    /// schema.
    ///
    /// # Errors
    /// Returns the rusqlite error of the first failing statement.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlModelError> {
        Ok(self.lock()?.execute_batch(sql)?)
    }
}

impl Preparer for SqliteConnector {
    type Stmt = SqlitePreparedStatement;

    fn prepare(&self, sql: &str) -> Result<Self::Stmt, SqlModelError> {
        // compile once so errors surface here; the handle re-fetches it from
        // the connection's statement cache on every call
        self.lock()?.prepare_cached(sql)?;
        Ok(SqlitePreparedStatement::new(self.clone(), sql.into()))
    }
}

impl Connector for SqliteConnector {
    type Tx<'c> = SqliteTx<'c>;

    fn begin(&self) -> Result<Self::Tx<'_>, SqlModelError> {
        SqliteTx::begin(self)
    }
}
