//! Field-set driven SQL mapping.
//!
//! A [`Model`] maps a struct onto a table; every field owns one bit of a
//! [`FieldSet`]. Operations take the fields to touch and the fields to
//! filter by as bit masks, render canonical SQL once per distinct
//! combination, and keep the prepared statement in a per-table cache:
//!
//! ```rust,no_run
//! use sql_model::prelude::*;
//!
//! sql_model::model! {
//!     #[derive(Debug, Default, Clone)]
//!     pub struct User in "user" {
//!         pub id: i64 => "id" as USER_ID,
//!         pub name: String => "name" as USER_NAME,
//!         pub age: i32 => "age" as USER_AGE,
//!     }
//! }
//!
//! # fn main() -> Result<(), SqlModelError> {
//! let db = Db::sqlite_builder(":memory:".into()).build()?;
//! db.connector()
//!     .execute_batch("CREATE TABLE user (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")?;
//!
//! let user = User { id: 1, name: "alice".into(), age: 30 };
//! db.insert(&user, User::FIELDS_ALL, ResultType::Nothing)?;
//!
//! let mut found = User { id: 1, ..User::default() };
//! db.one(&mut found, User::USER_NAME | User::USER_AGE, User::USER_ID)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Db`] prepares and caches statements; [`Tx`] reuses the cached SQL and
//! prepares inside the transaction. Query results land in a caller supplied
//! [`Store`] through a [`Scanner`].

pub mod backend;
pub mod cache;
pub mod cols;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod executor;
pub mod fieldset;
pub mod helpers;
mod macros;
pub mod model;
pub mod prelude;
pub mod scanner;
pub mod sqlid;
pub mod store;
pub mod table;
pub mod translation;
pub mod tx;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use backend::{Connector, Preparer, Statement, Transaction};
pub use cache::Cache;
pub use cols::Cols;
pub use config::{DbOptions, DbOptionsBuilder, DriverKind};
pub use db::Db;
pub use driver::Driver;
pub use error::SqlModelError;
pub use executor::{Executor, StmtTarget};
pub use fieldset::{FieldSet, MAX_NUMFIELDS, SqlType, all_fields, field, identity, num_fields};
pub use helpers::CondOption;
pub use model::Model;
pub use scanner::{Row, Rows, Scanner, Store};
pub use sqlid::{SqlId, SqlRegistry};
pub use store::{ModelStore, PairStore, ValueStore};
pub use table::Table;
pub use tx::Tx;
pub use types::{ExecResult, ResultType, RowValues, ScanTarget};
