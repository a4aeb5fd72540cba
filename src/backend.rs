//! Capability traits a database backend provides to the model layer.

use crate::error::SqlModelError;
use crate::scanner::Scanner;
use crate::types::{ExecResult, RowValues};

/// Turns SQL text into a reusable statement handle.
///
/// Implemented by whatever holds the live connection. Statements produced
/// here are stored in table caches and must stay valid for as long as the
/// preparer does.
pub trait Preparer {
    type Stmt: Statement + Clone;

    /// Prepare `sql` (already rewritten for the dialect).
    ///
    /// # Errors
    /// Propagates the backend's error verbatim.
    fn prepare(&self, sql: &str) -> Result<Self::Stmt, SqlModelError>;
}

/// A prepared statement.
pub trait Statement {
    /// Execute as DML.
    ///
    /// # Errors
    /// Propagates the backend's error verbatim.
    fn exec(&self, params: &[RowValues]) -> Result<ExecResult, SqlModelError>;

    /// Execute as a query and hand the result set to `scan`.
    ///
    /// The result set is released when `scan` returns, whether it succeeded
    /// or not.
    ///
    /// # Errors
    /// Propagates backend errors and whatever `scan` returns.
    fn query<R, F>(&self, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>;
}

/// An open transaction. Statements run inside it are prepared per call and
/// never outlive it.
pub trait Transaction {
    /// # Errors
    /// Propagates the backend's error verbatim.
    fn exec(&self, sql: &str, params: &[RowValues]) -> Result<ExecResult, SqlModelError>;

    /// # Errors
    /// Propagates backend errors and whatever `scan` returns.
    fn query<R, F>(&self, sql: &str, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>;

    /// # Errors
    /// Returns the backend error if the commit fails.
    fn commit(self) -> Result<(), SqlModelError>;

    /// # Errors
    /// Returns the backend error if the rollback fails.
    fn rollback(self) -> Result<(), SqlModelError>;
}

/// A preparer that can also open transactions.
pub trait Connector: Preparer {
    type Tx<'c>: Transaction
    where
        Self: 'c;

    /// # Errors
    /// Returns the backend error if the transaction cannot be started.
    fn begin(&self) -> Result<Self::Tx<'_>, SqlModelError>;
}
