use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlModelError;

/// SQL dialect spoken by the connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// SQLite, `LIMIT offset, count`
    #[default]
    Sqlite,
    /// MySQL, `LIMIT offset, count`
    Mysql,
    /// PostgreSQL, numbered `$n` placeholders and `LIMIT count OFFSET offset`
    Postgres,
}

impl FromStr for DriverKind {
    type Err = SqlModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
            .map_err(|e| SqlModelError::ConfigError(format!("unknown driver {s:?}: {e}")))
    }
}

fn default_initial_models() -> usize {
    10
}

/// Options shared by every table of a [`Db`](crate::Db).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbOptions {
    /// Initial store capacity for unbounded queries.
    #[serde(default = "default_initial_models")]
    pub initial_models: usize,
    /// Emit a `debug` event with the SQL text every time a statement is
    /// looked up.
    pub log_sql: bool,
    pub driver: DriverKind,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            initial_models: default_initial_models(),
            log_sql: false,
            driver: DriverKind::default(),
        }
    }
}

impl DbOptions {
    #[must_use]
    pub fn new(driver: DriverKind) -> Self {
        Self {
            driver,
            ..Self::default()
        }
    }

    /// Parse options from JSON; missing keys take their defaults.
    ///
    /// # Errors
    /// Returns [`SqlModelError::ConfigError`] for malformed JSON or unknown
    /// driver names.
    pub fn from_json(json: &str) -> Result<Self, SqlModelError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_log_sql(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }
}

/// Fluent builder for [`DbOptions`].
#[derive(Debug, Clone, Default)]
pub struct DbOptionsBuilder {
    opts: DbOptions,
}

impl DbOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn driver(mut self, driver: DriverKind) -> Self {
        self.opts.driver = driver;
        self
    }

    /// `0` falls back to the default.
    #[must_use]
    pub fn initial_models(mut self, initial_models: usize) -> Self {
        self.opts.initial_models = if initial_models == 0 {
            default_initial_models()
        } else {
            initial_models
        };
        self
    }

    #[must_use]
    pub fn log_sql(mut self, log_sql: bool) -> Self {
        self.opts.log_sql = log_sql;
        self
    }

    #[must_use]
    pub fn finish(self) -> DbOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = DbOptions::default();
        assert_eq!(opts.initial_models, 10);
        assert!(!opts.log_sql);
        assert_eq!(opts.driver, DriverKind::Sqlite);
    }

    #[test]
    fn parses_partial_json() {
        let opts = DbOptions::from_json(r#"{"driver": "postgres", "log_sql": true}"#).unwrap();
        assert_eq!(opts.driver, DriverKind::Postgres);
        assert!(opts.log_sql);
        assert_eq!(opts.initial_models, 10);
    }

    #[test]
    fn rejects_unknown_driver() {
        let err = DbOptions::from_json(r#"{"driver": "oracle"}"#).unwrap_err();
        assert!(matches!(err, SqlModelError::ConfigError(_)));
        assert!("ORACLE".parse::<DriverKind>().is_err());
        assert_eq!("MySQL".parse::<DriverKind>().unwrap(), DriverKind::Mysql);
    }

    #[test]
    fn builder_overrides() {
        let opts = DbOptionsBuilder::new()
            .driver(DriverKind::Mysql)
            .initial_models(0)
            .log_sql(true)
            .finish();
        assert_eq!(opts.initial_models, 10);
        assert_eq!(opts.driver, DriverKind::Mysql);
        assert!(opts.log_sql);
    }
}
