// SQLite backend, built on rusqlite:
// - config: options and builder for opening a `Db`
// - connection: the shared connection, implementing `Preparer` and `Connector`
// - prepared: cached statement handles
// - params / query: value conversion and result scanning
// - transaction: `Transaction` over the locked connection

pub mod config;
pub mod connection;
pub mod params;
pub mod prepared;
pub mod query;
pub mod transaction;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::{DEFAULT_STATEMENT_CACHE_CAPACITY, SqliteConnector};
pub use prepared::SqlitePreparedStatement;
pub use transaction::SqliteTx;
