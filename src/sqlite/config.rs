use crate::config::{DbOptions, DriverKind};
use crate::db::Db;
use crate::error::SqlModelError;

use super::connection::{DEFAULT_STATEMENT_CACHE_CAPACITY, SqliteConnector};

/// Options for opening a `SQLite` backed [`Db`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// File path, or `:memory:` for a private in-memory database.
    pub db_path: String,
    pub options: DbOptions,
    /// Compiled statements rusqlite keeps per connection.
    pub statement_cache_capacity: usize,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            options: DbOptions::new(DriverKind::Sqlite),
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DbOptions) -> Self {
        self.options = options;
        self
    }

    /// Open the connection and wrap it in a [`Db`].
    ///
    /// # Errors
    /// Returns [`SqlModelError::ConfigError`] when the options name another
    /// driver, or the rusqlite error if the database cannot be opened.
    pub fn open(self) -> Result<Db<SqliteConnector>, SqlModelError> {
        if self.options.driver != DriverKind::Sqlite {
            return Err(SqlModelError::ConfigError(format!(
                "sqlite connection configured with the {:?} driver",
                self.options.driver
            )));
        }
        let conn = if self.db_path == ":memory:" {
            SqliteConnector::open_in_memory()?
        } else {
            SqliteConnector::open(&self.db_path)?
        };
        conn.set_statement_cache_capacity(self.statement_cache_capacity)?;
        Ok(Db::new(conn, self.options))
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn initial_models(mut self, initial_models: usize) -> Self {
        self.opts.options.initial_models = initial_models.max(1);
        self
    }

    #[must_use]
    pub fn log_sql(mut self, log_sql: bool) -> Self {
        self.opts.options.log_sql = log_sql;
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// # Errors
    /// See [`SqliteOptions::open`].
    pub fn build(self) -> Result<Db<SqliteConnector>, SqlModelError> {
        self.finish().open()
    }
}

impl Db<SqliteConnector> {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}
