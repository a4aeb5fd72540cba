use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlModelError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// The query matched no rows. Callers decide whether that is an error.
    #[error("no rows in result set")]
    NoRows,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Value conversion error: {0}")]
    ConversionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlModelError {
    /// True for the distinguished "no rows" outcome.
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, SqlModelError::NoRows)
    }
}

impl From<serde_json::Error> for SqlModelError {
    fn from(err: serde_json::Error) -> Self {
        SqlModelError::ConfigError(format!("invalid options: {err}"))
    }
}
