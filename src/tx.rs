use std::sync::Arc;

use tracing::warn;

use crate::backend::{Connector, Transaction};
use crate::db::Db;
use crate::driver::Driver;
use crate::error::SqlModelError;
use crate::executor::{Executor, StmtTarget};
use crate::scanner::Scanner;
use crate::types::{ExecResult, RowValues};

/// A transaction over a [`Db`].
///
/// Mark the work as successful with [`Tx::success`] and finish with
/// [`Tx::close`], which commits or rolls back accordingly. A `Tx` dropped
/// without being closed rolls back.
pub struct Tx<'db, C: Connector + 'db> {
    db: &'db Db<C>,
    tx: Option<C::Tx<'db>>,
    success: bool,
}

impl<'db, C: Connector + 'db> std::fmt::Debug for Tx<'db, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("open", &self.tx.is_some())
            .field("success", &self.success)
            .finish_non_exhaustive()
    }
}

impl<'db, C: Connector + 'db> Tx<'db, C> {
    pub(crate) fn new(db: &'db Db<C>, tx: C::Tx<'db>) -> Self {
        Self {
            db,
            tx: Some(tx),
            success: false,
        }
    }

    /// Record whether the work done so far should be committed.
    pub fn success(&mut self, success: bool) {
        self.success = success;
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Commit if marked successful, roll back otherwise.
    ///
    /// # Errors
    /// Returns the backend error of the commit or rollback.
    pub fn close(mut self) -> Result<(), SqlModelError> {
        let tx = self.take()?;
        if self.success {
            tx.commit()
        } else {
            tx.rollback()
        }
    }

    /// # Errors
    /// Returns the backend error if the commit fails.
    pub fn commit(mut self) -> Result<(), SqlModelError> {
        self.take()?.commit()
    }

    /// # Errors
    /// Returns the backend error if the rollback fails.
    pub fn rollback(mut self) -> Result<(), SqlModelError> {
        self.take()?.rollback()
    }

    fn take(&mut self) -> Result<C::Tx<'db>, SqlModelError> {
        self.tx
            .take()
            .ok_or_else(|| SqlModelError::TransactionError("transaction already finished".into()))
    }

    fn active(&self) -> Result<&C::Tx<'db>, SqlModelError> {
        self.tx
            .as_ref()
            .ok_or_else(|| SqlModelError::TransactionError("transaction already finished".into()))
    }

    fn sql(&self, target: StmtTarget<'_>) -> Result<Arc<str>, SqlModelError> {
        match target {
            StmtTarget::Model {
                model,
                kind,
                fields,
                where_fields,
            } => Ok(self
                .db
                .table(model)
                .sql(self.db.driver_ref(), kind, fields, where_fields)),
            StmtTarget::ById(id) => self.db.registered_sql(id),
            StmtTarget::Sql(sql) => Ok(self.db.driver_ref().prepare(sql).as_ref().into()),
        }
    }
}

impl<'db, C: Connector + 'db> Executor for Tx<'db, C> {
    fn driver(&self) -> &dyn Driver {
        self.db.driver_ref()
    }

    fn initial_models(&self) -> usize {
        self.db.options().initial_models
    }

    fn exec_target(&self, target: StmtTarget<'_>, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
        let sql = self.sql(target)?;
        self.active()?.exec(&sql, params)
    }

    fn query_target<R, F>(&self, target: StmtTarget<'_>, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        let sql = self.sql(target)?;
        self.active()?.query(&sql, params, scan)
    }
}

impl<'db, C: Connector + 'db> Drop for Tx<'db, C> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            warn!("transaction dropped without close, rolling back");
            if let Err(e) = tx.rollback() {
                warn!(error = %e, "rollback of dropped transaction failed");
            }
        }
    }
}
