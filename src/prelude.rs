//! Convenient imports for common functionality.

pub use crate::config::{DbOptions, DbOptionsBuilder, DriverKind};
pub use crate::db::Db;
pub use crate::error::SqlModelError;
pub use crate::executor::Executor;
pub use crate::fieldset::{FieldSet, SqlType};
pub use crate::model::Model;
pub use crate::scanner::{Scanner, Store};
pub use crate::sqlid::SqlId;
pub use crate::store::{ModelStore, PairStore, ValueStore};
pub use crate::tx::Tx;
pub use crate::types::{ResultType, RowValues, ScanTarget};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnector, SqliteOptions, SqliteOptionsBuilder};
