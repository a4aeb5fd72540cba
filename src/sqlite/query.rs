use rusqlite::types::Value;
use rusqlite::Connection;

use crate::error::SqlModelError;
use crate::scanner::{Row, Rows, Scanner};
use crate::types::{ExecResult, RowValues, ScanTarget};

use super::params::Params;

/// Extract a [`RowValues`] from a `SQLite` row.
///
/// # Errors
/// Returns the rusqlite error for an out of range column.
pub fn sqlite_extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<RowValues, SqlModelError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

impl Row for rusqlite::Row<'_> {
    fn scan(&self, targets: &mut [&mut dyn ScanTarget]) -> Result<(), SqlModelError> {
        for (idx, target) in targets.iter_mut().enumerate() {
            target.set_value(sqlite_extract_value(self, idx)?)?;
        }
        Ok(())
    }
}

struct SqliteRows<'s> {
    rows: rusqlite::Rows<'s>,
    columns: usize,
}

impl Rows for SqliteRows<'_> {
    fn columns(&self) -> usize {
        self.columns
    }

    fn next_row(&mut self) -> Result<Option<&dyn Row>, SqlModelError> {
        Ok(self.rows.next()?.map(|row| row as &dyn Row))
    }
}

/// Run `sql` as DML through the connection's statement cache.
pub(crate) fn exec(conn: &Connection, sql: &str, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
    let params = Params::convert(params);
    let mut stmt = conn.prepare_cached(sql)?;
    let changed = stmt.execute(params.as_params())?;
    Ok(ExecResult {
        rows_affected: changed as u64,
        last_insert_id: conn.last_insert_rowid(),
    })
}

/// Run `sql` as a query and hand its rows to `scan`. The rows are released
/// before this returns.
pub(crate) fn query<R, F>(conn: &Connection, sql: &str, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
where
    F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
{
    let params = Params::convert(params);
    let mut stmt = conn.prepare_cached(sql)?;
    let columns = stmt.column_count();
    let mut rows = SqliteRows {
        rows: stmt.query(params.as_params())?,
        columns,
    };
    scan(Scanner::new(&mut rows))
}
