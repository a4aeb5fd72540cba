use std::sync::Arc;

use crate::backend::Statement;
use crate::error::SqlModelError;
use crate::scanner::Scanner;
use crate::types::{ExecResult, RowValues};

use super::connection::SqliteConnector;
use super::query;

/// Handle to a prepared `SQLite` statement.
///
/// Cloning is cheap. The compiled statement lives in rusqlite's per
/// connection cache (`prepare_cached`); the handle keeps the SQL that finds
/// it again. That cache holds
/// [`SqliteConnector::statement_cache_capacity`] statements, least recently
/// used first out, so handles beyond it stay valid but recompile on use.
#[derive(Clone, Debug)]
pub struct SqlitePreparedStatement {
    connection: SqliteConnector,
    query: Arc<str>,
}

impl SqlitePreparedStatement {
    pub(crate) fn new(connection: SqliteConnector, query: Arc<str>) -> Self {
        Self { connection, query }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.query
    }
}

impl Statement for SqlitePreparedStatement {
    fn exec(&self, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
        query::exec(&*self.connection.lock()?, &self.query, params)
    }

    fn query<R, F>(&self, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        query::query(&*self.connection.lock()?, &self.query, params, scan)
    }
}
