//! Row materialization.
//!
//! A [`Scanner`] walks a result set and fills a caller supplied [`Store`]:
//!
//! 1. first row: `Store::init(capacity)` and one scan-target buffer for the
//!    whole call;
//! 2. every row: grow through `Store::realloc` once the capacity is used up
//!    (`0` stops the scan), then `Store::ptrs` + scan;
//! 3. end of rows or stop: `Store::finish(rows_read)`.
//!
//! Zero rows yield [`SqlModelError::NoRows`]. A scan error is returned as is
//! and `finish` is not called, so the store content is undefined afterwards.

use crate::error::SqlModelError;
use crate::types::ScanTarget;

/// Initial store capacity when the caller passes `0` to [`Scanner::all`].
pub const DEFAULT_ROW_COUNT: usize = 10;

/// One row of a result set.
pub trait Row {
    /// Decode the leading `targets.len()` columns into `targets`.
    ///
    /// # Errors
    /// Returns backend or conversion errors.
    fn scan(&self, targets: &mut [&mut dyn ScanTarget]) -> Result<(), SqlModelError>;
}

/// A forward-only result set.
pub trait Rows {
    /// Number of columns in every row.
    fn columns(&self) -> usize;

    /// Advance to the next row, `None` once drained.
    ///
    /// # Errors
    /// Propagates the backend's error verbatim.
    fn next_row(&mut self) -> Result<Option<&dyn Row>, SqlModelError>;
}

/// A caller-owned sink for query results.
pub trait Store {
    /// Called once, before the first row, with the expected row count.
    fn init(&mut self, capacity: usize);

    /// Called when `capacity` rows have been stored and another row arrived.
    /// Returns the new capacity, or `0` to stop scanning.
    fn realloc(&mut self, capacity: usize) -> usize;

    /// Push one scan target per selected column for the row at `index`.
    fn ptrs<'a>(&'a mut self, index: usize, ptrs: &mut Vec<&'a mut dyn ScanTarget>);

    /// Called once with the number of rows actually stored.
    fn finish(&mut self, len: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanType {
    All,
    Limit,
}

/// Drives a result set into a [`Store`] or a set of scan targets.
pub struct Scanner<'r> {
    rows: &'r mut dyn Rows,
}

impl<'r> Scanner<'r> {
    pub fn new(rows: &'r mut dyn Rows) -> Self {
        Self { rows }
    }

    /// Scan every row, starting with `initial` capacity and growing on demand.
    ///
    /// # Errors
    /// [`SqlModelError::NoRows`] for an empty result set, otherwise backend or
    /// conversion errors.
    pub fn all<S: Store + ?Sized>(self, store: &mut S, initial: usize) -> Result<usize, SqlModelError> {
        let initial = if initial == 0 {
            DEFAULT_ROW_COUNT
        } else {
            initial
        };
        self.multiple(store, initial, ScanType::All)
    }

    /// Scan at most `count` rows. Rows beyond `count` are never fetched.
    ///
    /// # Errors
    /// [`SqlModelError::NoRows`] when nothing was read, otherwise backend or
    /// conversion errors.
    pub fn limit<S: Store + ?Sized>(self, store: &mut S, count: usize) -> Result<usize, SqlModelError> {
        self.multiple(store, count, ScanType::Limit)
    }

    /// Scan the first row into `targets`.
    ///
    /// # Errors
    /// [`SqlModelError::NoRows`] for an empty result set, otherwise backend or
    /// conversion errors.
    pub fn one(self, targets: &mut [&mut dyn ScanTarget]) -> Result<(), SqlModelError> {
        match self.rows.next_row()? {
            Some(row) => row.scan(targets),
            None => Err(SqlModelError::NoRows),
        }
    }

    fn multiple<S: Store + ?Sized>(
        self,
        store: &mut S,
        mut capacity: usize,
        scan_type: ScanType,
    ) -> Result<usize, SqlModelError> {
        let columns = self.rows.columns();
        let mut index = 0;
        let mut buf: Vec<&mut dyn ScanTarget> = Vec::new();

        loop {
            if scan_type == ScanType::Limit && index == capacity {
                break;
            }
            let Some(row) = self.rows.next_row()? else {
                break;
            };

            if index == 0 {
                store.init(capacity);
                buf = Vec::with_capacity(columns);
            } else if index == capacity {
                let grown = store.realloc(capacity);
                if grown <= index {
                    break;
                }
                capacity = grown;
            }

            let mut ptrs = recycle(buf);
            store.ptrs(index, &mut ptrs);
            row.scan(&mut ptrs)?;
            buf = recycle(ptrs);
            index += 1;
        }

        if index == 0 {
            return Err(SqlModelError::NoRows);
        }
        store.finish(index);
        Ok(index)
    }
}

/// Empty the buffer and hand its allocation back under a fresh lifetime.
fn recycle<'b>(mut buf: Vec<&mut dyn ScanTarget>) -> Vec<&'b mut dyn ScanTarget> {
    buf.clear();
    buf.into_iter()
        .map(|_| -> &'b mut dyn ScanTarget { unreachable!() })
        .collect()
}
