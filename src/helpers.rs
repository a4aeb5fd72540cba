//! Small utilities for building calls out of optional conditions and for
//! interpreting constraint errors.

use crate::error::SqlModelError;
use crate::executor::Executor;
use crate::fieldset::FieldSet;
use crate::sqlid::SqlId;
use crate::types::{RowValues, ScanTarget};

/// A query whose where-fields depend on which arguments are set.
///
/// `cond_fields[i]` joins the where-set only if `args[cond_arg_indexes[i]]`
/// carries a usable value (non-zero, non-empty, `true`, non-NULL); otherwise
/// that argument is dropped. Indexes refer to the original `args` and must be
/// ascending.
#[derive(Debug, Clone, Default)]
pub struct CondOption {
    pub other_fields: FieldSet,
    pub cond_fields: Vec<FieldSet>,
    pub cond_arg_indexes: Vec<usize>,
    pub args: Vec<RowValues>,
}

impl CondOption {
    /// Resolve the final where-set and the arguments that go with it.
    ///
    /// # Panics
    /// When `cond_fields` and `cond_arg_indexes` differ in length or an
    /// index is out of range.
    #[must_use]
    pub fn cond_args(self) -> (FieldSet, Vec<RowValues>) {
        assert_eq!(
            self.cond_fields.len(),
            self.cond_arg_indexes.len(),
            "every conditional field needs an argument index"
        );
        let mut fields = self.other_fields;
        let mut args = self.args;
        let mut skipped = 0;
        for (field, index) in self.cond_fields.iter().zip(&self.cond_arg_indexes) {
            let index = index - skipped;
            if usable(&args[index]) {
                fields |= field;
            } else {
                args.remove(index);
                skipped += 1;
            }
        }
        (fields, args)
    }
}

fn usable(value: &RowValues) -> bool {
    match value {
        RowValues::Int(i) => *i != 0,
        RowValues::Float(f) => *f != 0.0,
        RowValues::Text(s) => !s.is_empty(),
        RowValues::Bool(b) => *b,
        RowValues::Null => false,
        RowValues::Blob(b) => !b.is_empty(),
        RowValues::JSON(json) => !json.is_null(),
        RowValues::Timestamp(_) => true,
    }
}

/// Validate an increment: `field` is one of `fields` and `delta` is ±1.
///
/// # Errors
/// [`SqlModelError::Other`] describing the violated rule.
pub fn check_field_for_incr_by(field: FieldSet, fields: FieldSet, delta: i64) -> Result<(), SqlModelError> {
    if field.count_ones() != 1 || field & fields == 0 {
        return Err(SqlModelError::Other(format!("unexpected field {field:#b} for incr_by")));
    }
    if delta != 1 && delta != -1 {
        return Err(SqlModelError::Other(format!(
            "unexpected incr_by delta {delta}, must be -1 or 1"
        )));
    }
    Ok(())
}

/// Replace a unique violation on `key` with `replacement`; any other error
/// passes through unchanged.
pub fn on_duplicate_key<E: Executor + ?Sized>(
    exec: &E,
    err: SqlModelError,
    key: &str,
    replacement: impl FnOnce() -> SqlModelError,
) -> SqlModelError {
    match exec.duplicate_key(&err) {
        Some(found) if found == key => replacement(),
        _ => err,
    }
}

/// Let `keyfunc` replace a foreign key violation. It receives the key the
/// driver reports, empty when the driver (`SQLite`) names none, and returns
/// `None` to keep `err`. Any other error passes through unchanged.
pub fn on_foreign_key<E: Executor + ?Sized>(
    exec: &E,
    err: SqlModelError,
    keyfunc: impl FnOnce(&str) -> Option<SqlModelError>,
) -> SqlModelError {
    match exec.foreign_key(&err) {
        Some(key) => keyfunc(&key).unwrap_or(err),
        None => err,
    }
}

/// Run registered SQL that yields a single count, e.g. `SELECT COUNT(*)`.
///
/// # Errors
/// [`SqlModelError::NoRows`] when the query returns nothing, otherwise the
/// backend or conversion error.
pub fn query_count_by_id<E: Executor + ?Sized>(exec: &E, id: SqlId, args: &[RowValues]) -> Result<i64, SqlModelError> {
    let mut count = 0i64;
    query_one_by_id(exec, id, &mut [&mut count], args)?;
    Ok(count)
}

/// Scan the first row of registered SQL into `targets`.
///
/// # Errors
/// [`SqlModelError::NoRows`] when the query returns nothing.
pub fn query_one_by_id<E: Executor + ?Sized>(
    exec: &E,
    id: SqlId,
    targets: &mut [&mut dyn ScanTarget],
    args: &[RowValues],
) -> Result<(), SqlModelError> {
    exec.query_by_id(id, args, |scanner| scanner.one(targets))
}

/// Turn "no rows changed" into `err`.
///
/// # Errors
/// `err()` when `rows_affected` is zero.
pub fn ensure_affected(rows_affected: u64, err: impl FnOnce() -> SqlModelError) -> Result<u64, SqlModelError> {
    if rows_affected == 0 {
        Err(err())
    } else {
        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_unset_conditions() {
        let opt = CondOption {
            other_fields: 0b1,
            cond_fields: vec![0b10, 0b100, 0b1000],
            cond_arg_indexes: vec![1, 2, 3],
            args: vec![
                RowValues::Int(7),
                RowValues::Text(String::new()),
                RowValues::Bool(true),
                RowValues::Int(0),
            ],
        };
        let (fields, args) = opt.cond_args();
        assert_eq!(fields, 0b101);
        assert_eq!(args, vec![RowValues::Int(7), RowValues::Bool(true)]);
    }

    #[test]
    fn incr_by_rules() {
        assert!(check_field_for_incr_by(0b10, 0b110, 1).is_ok());
        assert!(check_field_for_incr_by(0b10, 0b100, 1).is_err());
        assert!(check_field_for_incr_by(0b110, 0b110, 1).is_err());
        assert!(check_field_for_incr_by(0b10, 0b10, 2).is_err());
    }

    #[test]
    fn ensure_affected_rejects_zero() {
        assert_eq!(ensure_affected(2, || SqlModelError::NoRows).unwrap(), 2);
        assert!(ensure_affected(0, || SqlModelError::NoRows).unwrap_err().is_no_rows());
    }
}
