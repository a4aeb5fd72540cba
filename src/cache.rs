//! Per-table statement cache.
//!
//! Two maps keyed by the same identity: generated SQL text, and the prepared
//! statement for it. SQL text is read on every transaction call, so it lives
//! behind an `RwLock` that is never held across a prepare. Statements are
//! created under the `stmts` mutex, so two callers racing on one identity
//! prepare it exactly once.
//!
//! Lock order is `stmts` then `sqls` then the backend connection; `sqls` is
//! never held while waiting on anything else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::debug;

use crate::backend::Preparer;
use crate::error::SqlModelError;

#[derive(Debug)]
pub struct Cache<S> {
    sqls: RwLock<HashMap<u64, Arc<str>>>,
    stmts: Mutex<HashMap<u64, S>>,
    log_sql: bool,
}

impl<S> Default for Cache<S> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<S> Cache<S> {
    #[must_use]
    pub fn new(log_sql: bool) -> Self {
        Self {
            sqls: RwLock::new(HashMap::new()),
            stmts: Mutex::new(HashMap::new()),
            log_sql,
        }
    }

    fn lock_stmts(&self) -> MutexGuard<'_, HashMap<u64, S>> {
        self.stmts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, cached: bool, sql: &str) {
        if self.log_sql {
            debug!(target: "sql_model::sql", cached, sql, "statement");
        }
    }

    /// SQL stored under `id`, if any.
    #[must_use]
    pub fn sql(&self, id: u64) -> Option<Arc<str>> {
        self.sqls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Store SQL under `id`, keeping any prepared statement.
    pub fn set_sql(&self, id: u64, sql: impl Into<Arc<str>>) {
        self.sqls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sql.into());
    }

    /// SQL for `id`, building and storing it on first use.
    pub fn sql_or_build(&self, id: u64, build: impl FnOnce() -> String) -> Arc<str> {
        if let Some(sql) = self.sql(id) {
            self.log(true, &sql);
            return sql;
        }
        let mut sqls = self.sqls.write().unwrap_or_else(PoisonError::into_inner);
        let sql = sqls.entry(id).or_insert_with(|| build().into()).clone();
        drop(sqls);
        self.log(false, &sql);
        sql
    }

    /// Drop every prepared statement, keeping the SQL.
    pub fn clear_stmts(&self) {
        self.lock_stmts().clear();
    }

    /// Number of identities with SQL stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sqls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Clone> Cache<S> {
    /// Statement for `id`, or `None` when no SQL was ever stored for it.
    /// An entry whose statement was cleared is prepared again from its SQL.
    ///
    /// # Errors
    /// Propagates prepare failures; the entry keeps its SQL and no statement.
    pub fn get_stmt<P>(&self, preparer: &P, id: u64) -> Result<Option<S>, SqlModelError>
    where
        P: Preparer<Stmt = S> + ?Sized,
    {
        let mut stmts = self.lock_stmts();
        if let Some(stmt) = stmts.get(&id) {
            return Ok(Some(stmt.clone()));
        }
        let Some(sql) = self.sql(id) else {
            return Ok(None);
        };
        let stmt = preparer.prepare(&sql)?;
        stmts.insert(id, stmt.clone());
        self.log(false, &sql);
        Ok(Some(stmt))
    }

    /// Prepare `sql` and store it under `id`, replacing any previous entry.
    ///
    /// # Errors
    /// Propagates prepare failures without touching the cache.
    pub fn set_stmt<P>(&self, preparer: &P, id: u64, sql: impl Into<Arc<str>>) -> Result<S, SqlModelError>
    where
        P: Preparer<Stmt = S> + ?Sized,
    {
        let sql = sql.into();
        let mut stmts = self.lock_stmts();
        let stmt = preparer.prepare(&sql)?;
        self.set_sql(id, Arc::clone(&sql));
        stmts.insert(id, stmt.clone());
        self.log(false, &sql);
        Ok(stmt)
    }

    /// Statement for `id`, building the SQL and preparing it on first use.
    ///
    /// `build` runs at most once per identity. Concurrent callers wait for
    /// the first one and then share its statement.
    ///
    /// # Errors
    /// Propagates `build` and prepare failures; nothing is stored for `id`
    /// then, so a later call retries.
    pub fn get_or_prepare<P>(
        &self,
        preparer: &P,
        id: u64,
        build: impl FnOnce() -> Result<String, SqlModelError>,
    ) -> Result<S, SqlModelError>
    where
        P: Preparer<Stmt = S> + ?Sized,
    {
        let mut stmts = self.lock_stmts();
        if let Some(stmt) = stmts.get(&id) {
            if self.log_sql {
                if let Some(sql) = self.sql(id) {
                    self.log(true, &sql);
                }
            }
            return Ok(stmt.clone());
        }
        let (sql, fresh) = match self.sql(id) {
            Some(sql) => (sql, false),
            None => (Arc::<str>::from(build()?), true),
        };
        let stmt = preparer.prepare(&sql)?;
        if fresh {
            self.set_sql(id, Arc::clone(&sql));
        }
        stmts.insert(id, stmt.clone());
        self.log(false, &sql);
        Ok(stmt)
    }
}
