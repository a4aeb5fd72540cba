use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{Connector, Preparer, Statement, Transaction};
use crate::error::SqlModelError;
use crate::scanner::{Row, Rows, Scanner};
use crate::types::{ExecResult, RowValues, ScanTarget};

#[derive(Debug, Default)]
struct State {
    prepared: Vec<String>,
    executed: Vec<(String, Vec<RowValues>)>,
    results: VecDeque<Vec<Vec<RowValues>>>,
    fail_prepare: Option<String>,
    fetched: usize,
    open_result_sets: usize,
    tx_log: Vec<&'static str>,
    last_insert_id: i64,
}

/// Connector that records every call instead of talking to a database.
///
/// Queries return the row batches queued with [`MemoryConnector::push_rows`],
/// oldest first, and an empty result once the queue is drained. DML reports
/// one affected row and an increasing insert id.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<State>>,
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Queue the rows returned by the next query.
    pub fn push_rows(&self, rows: Vec<Vec<RowValues>>) {
        self.state().results.push_back(rows);
    }

    /// Make every prepare fail with `message` until [`Self::clear_failure`].
    pub fn fail_prepare(&self, message: &str) {
        self.state().fail_prepare = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        self.state().fail_prepare = None;
    }

    #[must_use]
    pub fn prepare_count(&self) -> usize {
        self.state().prepared.len()
    }

    /// SQL of every successful prepare, in order.
    #[must_use]
    pub fn prepared(&self) -> Vec<String> {
        self.state().prepared.clone()
    }

    /// Every statement run, with its parameters.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Vec<RowValues>)> {
        self.state().executed.clone()
    }

    /// Rows handed out across all result sets.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.state().fetched
    }

    /// Result sets created and not yet released.
    #[must_use]
    pub fn open_result_sets(&self) -> usize {
        self.state().open_result_sets
    }

    /// `begin`, `commit` and `rollback` calls, in order.
    #[must_use]
    pub fn tx_log(&self) -> Vec<&'static str> {
        self.state().tx_log.clone()
    }

    fn exec(&self, sql: &str, params: &[RowValues]) -> ExecResult {
        let mut state = self.state();
        state.executed.push((sql.to_string(), params.to_vec()));
        state.last_insert_id += 1;
        ExecResult {
            rows_affected: 1,
            last_insert_id: state.last_insert_id,
        }
    }

    fn query<R, F>(&self, sql: &str, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        let rows = {
            let mut state = self.state();
            state.executed.push((sql.to_string(), params.to_vec()));
            state.open_result_sets += 1;
            state.results.pop_front().unwrap_or_default()
        };
        let mut rows = MemoryRows {
            columns: rows.first().map_or(0, Vec::len),
            rows: rows.into_iter().map(MemoryRow).collect(),
            pos: 0,
            state: Arc::clone(&self.state),
        };
        scan(Scanner::new(&mut rows))
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Preparer for MemoryConnector {
    type Stmt = MemoryStmt;

    fn prepare(&self, sql: &str) -> Result<Self::Stmt, SqlModelError> {
        let mut state = self.state();
        if let Some(message) = &state.fail_prepare {
            return Err(SqlModelError::ExecutionError(message.clone()));
        }
        state.prepared.push(sql.to_string());
        Ok(MemoryStmt {
            sql: sql.into(),
            conn: self.clone(),
        })
    }
}

impl Connector for MemoryConnector {
    type Tx<'c> = MemoryTx<'c>;

    fn begin(&self) -> Result<Self::Tx<'_>, SqlModelError> {
        self.state().tx_log.push("begin");
        Ok(MemoryTx { conn: self })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStmt {
    sql: Arc<str>,
    conn: MemoryConnector,
}

impl MemoryStmt {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Statement for MemoryStmt {
    fn exec(&self, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
        Ok(self.conn.exec(&self.sql, params))
    }

    fn query<R, F>(&self, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        self.conn.query(&self.sql, params, scan)
    }
}

#[derive(Debug)]
pub struct MemoryTx<'c> {
    conn: &'c MemoryConnector,
}

impl Transaction for MemoryTx<'_> {
    fn exec(&self, sql: &str, params: &[RowValues]) -> Result<ExecResult, SqlModelError> {
        Ok(self.conn.exec(sql, params))
    }

    fn query<R, F>(&self, sql: &str, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        self.conn.query(sql, params, scan)
    }

    fn commit(self) -> Result<(), SqlModelError> {
        self.conn.state().tx_log.push("commit");
        Ok(())
    }

    fn rollback(self) -> Result<(), SqlModelError> {
        self.conn.state().tx_log.push("rollback");
        Ok(())
    }
}

struct MemoryRow(Vec<RowValues>);

impl Row for MemoryRow {
    fn scan(&self, targets: &mut [&mut dyn ScanTarget]) -> Result<(), SqlModelError> {
        if targets.len() > self.0.len() {
            return Err(SqlModelError::ExecutionError(format!(
                "{} scan targets for {} columns",
                targets.len(),
                self.0.len()
            )));
        }
        for (target, value) in targets.iter_mut().zip(&self.0) {
            target.set_value(value.clone())?;
        }
        Ok(())
    }
}

struct MemoryRows {
    rows: Vec<MemoryRow>,
    columns: usize,
    pos: usize,
    state: Arc<Mutex<State>>,
}

impl Rows for MemoryRows {
    fn columns(&self) -> usize {
        self.columns
    }

    fn next_row(&mut self) -> Result<Option<&dyn Row>, SqlModelError> {
        let Some(row) = self.rows.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;
        lock(&self.state).fetched += 1;
        Ok(Some(row as &dyn Row))
    }
}

impl Drop for MemoryRows {
    fn drop(&mut self) {
        lock(&self.state).open_result_sets -= 1;
    }
}
