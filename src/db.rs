use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::backend::{Connector, Statement};
use crate::cache::Cache;
use crate::config::DbOptions;
use crate::driver::Driver;
use crate::error::SqlModelError;
use crate::executor::{Executor, StmtTarget};
use crate::model::Model;
use crate::scanner::Scanner;
use crate::sqlid::{SqlId, SqlRegistry};
use crate::table::Table;
use crate::tx::Tx;
use crate::types::{ExecResult, RowValues};

/// A connection plus the tables mapped onto it.
///
/// Model operations go through per-table statement caches: the first call
/// for a given operation and field-set prepares the statement, later calls
/// reuse it.
pub struct Db<C: Connector> {
    conn: C,
    driver: Box<dyn Driver>,
    options: DbOptions,
    tables: RwLock<HashMap<&'static str, Arc<Table<C::Stmt>>>>,
    cache: Cache<C::Stmt>,
    registry: Arc<SqlRegistry>,
}

impl<C: Connector> fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.driver.name())
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Db<C> {
    pub fn new(conn: C, options: DbOptions) -> Self {
        Self::with_registry(conn, options, Arc::new(SqlRegistry::new()))
    }

    /// Share a registry between databases, e.g. a primary and its replica.
    pub fn with_registry(conn: C, options: DbOptions, registry: Arc<SqlRegistry>) -> Self {
        Self {
            conn,
            driver: options.driver.driver(),
            cache: Cache::new(options.log_sql),
            options,
            tables: RwLock::new(HashMap::new()),
            registry,
        }
    }

    #[must_use]
    pub fn connector(&self) -> &C {
        &self.conn
    }

    #[must_use]
    pub fn options(&self) -> &DbOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SqlRegistry> {
        &self.registry
    }

    /// Register SQL built from the active driver; see [`SqlRegistry::register`].
    pub fn register_sql<F>(&self, create: F) -> SqlId
    where
        F: Fn(&dyn Driver) -> String + Send + Sync + 'static,
    {
        self.registry.register(create)
    }

    /// The table of `model`, created on first use.
    ///
    /// # Panics
    /// When the model declares more fields than a table supports.
    pub fn table(&self, model: &dyn Model) -> Arc<Table<C::Stmt>> {
        let name = model.table();
        if let Some(table) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(table);
        }
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .entry(name)
            .or_insert_with(|| Arc::new(Table::for_model(model, self.options.log_sql)));
        Arc::clone(table)
    }

    /// Drop every cached statement, keeping generated SQL. Needed after
    /// schema changes that invalidate prepared statements.
    pub fn clear_stmts(&self) {
        for table in self.tables.read().unwrap_or_else(PoisonError::into_inner).values() {
            table.cache().clear_stmts();
        }
        self.cache.clear_stmts();
    }

    /// Dialect-ready SQL of a registered id, cached after the first render.
    pub(crate) fn registered_sql(&self, id: SqlId) -> Result<Arc<str>, SqlModelError> {
        self.check_registered(id)?;
        let identity = id.identity();
        if let Some(sql) = self.cache.sql(identity) {
            return Ok(sql);
        }
        let sql: Arc<str> = self.driver.prepare(&self.render(id)?).as_ref().into();
        self.cache.set_sql(identity, Arc::clone(&sql));
        Ok(sql)
    }

    fn render(&self, id: SqlId) -> Result<String, SqlModelError> {
        self.registry
            .sql(id, self.driver.as_ref())
            .ok_or_else(|| unregistered(id))
    }

    // cache identities only carry the index, so ownership is checked first
    fn check_registered(&self, id: SqlId) -> Result<(), SqlModelError> {
        if self.registry.contains(id) {
            Ok(())
        } else {
            Err(unregistered(id))
        }
    }

    /// Cached statement for `target`; raw SQL is prepared fresh.
    fn stmt(&self, target: StmtTarget<'_>) -> Result<C::Stmt, SqlModelError> {
        match target {
            StmtTarget::Model {
                model,
                kind,
                fields,
                where_fields,
            } => self
                .table(model)
                .stmt(&self.conn, self.driver.as_ref(), kind, fields, where_fields),
            StmtTarget::ById(id) => {
                self.check_registered(id)?;
                self.cache.get_or_prepare(&self.conn, id.identity(), || {
                    Ok(self.driver.prepare(&self.render(id)?).into_owned())
                })
            }
            StmtTarget::Sql(sql) => self.conn.prepare(&self.driver.prepare(sql)),
        }
    }

    /// Start a transaction. Statements inside it are prepared per call from
    /// the cached SQL.
    ///
    /// # Errors
    /// Returns the backend error if the transaction cannot be started.
    pub fn begin(&self) -> Result<Tx<'_, C>, SqlModelError> {
        Ok(Tx::new(self, self.conn.begin()?))
    }

    /// Run `f` in a transaction, committing when it returns `Ok` and rolling
    /// back otherwise.
    ///
    /// # Errors
    /// Whatever `f` returns, or a begin/commit failure.
    pub fn transaction<'db, R, F>(&'db self, f: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(&Tx<'db, C>) -> Result<R, SqlModelError>,
    {
        let mut tx = self.begin()?;
        match f(&tx) {
            Ok(value) => {
                tx.success(true);
                tx.close()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.close() {
                    warn!(error = %rollback, "rollback after failed transaction body");
                }
                Err(e)
            }
        }
    }

    pub(crate) fn driver_ref(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

fn unregistered(id: SqlId) -> SqlModelError {
    SqlModelError::ConfigError(format!("{id} is not registered"))
}

impl<C: Connector> Executor for Db<C> {
    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    fn initial_models(&self) -> usize {
        self.options.initial_models
    }

    fn exec_target(&self, target: StmtTarget<'_>, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
        self.stmt(target)?.exec(params)
    }

    fn query_target<R, F>(&self, target: StmtTarget<'_>, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        self.stmt(target)?.query(params, scan)
    }
}
