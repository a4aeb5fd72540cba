use std::sync::MutexGuard;
use std::thread;

use rusqlite::Connection;
use tracing::warn;

use crate::backend::Transaction;
use crate::error::SqlModelError;
use crate::scanner::Scanner;
use crate::types::{ExecResult, RowValues};

use super::connection::SqliteConnector;
use super::query;

/// Transaction handle that holds the `SQLite` connection until completion.
pub struct SqliteTx<'c> {
    conn: MutexGuard<'c, Connection>,
    connector: &'c SqliteConnector,
    done: bool,
}

impl<'c> SqliteTx<'c> {
    pub(crate) fn begin(connector: &'c SqliteConnector) -> Result<Self, SqlModelError> {
        let conn = connector.lock()?;
        conn.execute_batch("BEGIN")?;
        connector.set_tx_thread(Some(thread::current().id()));
        Ok(Self {
            conn,
            connector,
            done: false,
        })
    }

    fn finish(mut self, sql: &str) -> Result<(), SqlModelError> {
        // a failed COMMIT leaves the transaction open; drop rolls it back
        self.conn.execute_batch(sql)?;
        self.done = true;
        Ok(())
    }
}

impl Transaction for SqliteTx<'_> {
    fn exec(&self, sql: &str, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
        query::exec(&self.conn, sql, params)
    }

    fn query<R, F>(&self, sql: &str, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        query::query(&self.conn, sql, params, scan)
    }

    fn commit(self) -> Result<(), SqlModelError> {
        self.finish("COMMIT")
    }

    fn rollback(self) -> Result<(), SqlModelError> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.done {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "sqlite rollback on drop failed");
            }
        }
        // the guard is released right after this body
        self.connector.set_tx_thread(None);
    }
}
