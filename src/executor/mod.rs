//! Model level operations shared by [`Db`](crate::Db) and [`Tx`](crate::Tx).
//!
//! Implementors only resolve a [`StmtTarget`] and run it; every operation is
//! a provided method on top of those two primitives. Methods without the
//! `args_` prefix read their parameters from the model; the `args_` variants
//! take the complete parameter list from the caller and use the model only
//! to pick the table.

mod targets;

pub use targets::StmtTarget;

use crate::driver::Driver;
use crate::error::SqlModelError;
use crate::fieldset::{FieldSet, SqlType};
use crate::model::{Model, field_ptrs, field_vals, field_where_vals};
use crate::scanner::{Scanner, Store};
use crate::sqlid::SqlId;
use crate::types::{ExecResult, ResultType, RowValues};

pub trait Executor {
    fn driver(&self) -> &dyn Driver;

    /// Initial store capacity for [`Executor::all`].
    fn initial_models(&self) -> usize;

    /// Run `target` as DML.
    ///
    /// # Errors
    /// Prepare or execution failures.
    fn exec_target(&self, target: StmtTarget<'_>, params: &[RowValues]) -> Result<ExecResult, SqlModelError>;

    /// Run `target` as a query and scan its rows with `scan`.
    ///
    /// # Errors
    /// Prepare or query failures, and whatever `scan` returns.
    fn query_target<R, F>(&self, target: StmtTarget<'_>, params: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>;

    /// Insert the selected fields.
    ///
    /// # Errors
    /// Prepare or execution failures.
    fn insert(&self, model: &dyn Model, fields: FieldSet, res: ResultType) -> Result<i64, SqlModelError> {
        let params = field_vals(model, fields, &[]);
        self.args_insert(model, fields, res, &params)
    }

    /// # Errors
    /// Prepare or execution failures.
    fn args_insert(
        &self,
        model: &dyn Model,
        fields: FieldSet,
        res: ResultType,
        args: &[RowValues],
    ) -> Result<i64, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::Insert, fields, 0);
        Ok(self.exec_target(target, args)?.resolve(res))
    }

    /// `UPDATE .. SET fields WHERE where_fields`, values taken from the model.
    /// Returns the number of changed rows.
    ///
    /// # Errors
    /// Prepare or execution failures.
    fn update(&self, model: &dyn Model, fields: FieldSet, where_fields: FieldSet) -> Result<u64, SqlModelError> {
        let params = field_where_vals(model, fields, where_fields);
        self.args_update(model, fields, where_fields, &params)
    }

    /// # Errors
    /// Prepare or execution failures.
    fn args_update(
        &self,
        model: &dyn Model,
        fields: FieldSet,
        where_fields: FieldSet,
        args: &[RowValues],
    ) -> Result<u64, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::Update, fields, where_fields);
        Ok(self.exec_target(target, args)?.rows_affected)
    }

    /// # Errors
    /// Prepare or execution failures.
    fn delete(&self, model: &dyn Model, where_fields: FieldSet) -> Result<u64, SqlModelError> {
        let params = field_vals(model, where_fields, &[]);
        self.args_delete(model, where_fields, &params)
    }

    /// # Errors
    /// Prepare or execution failures.
    fn args_delete(&self, model: &dyn Model, where_fields: FieldSet, args: &[RowValues]) -> Result<u64, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::Delete, 0, where_fields);
        Ok(self.exec_target(target, args)?.rows_affected)
    }

    /// `UPDATE .. SET field=field+delta WHERE where_fields`.
    ///
    /// # Errors
    /// Prepare or execution failures.
    ///
    /// # Panics
    /// When `field` is not exactly one field.
    fn incr_by(&self, model: &dyn Model, field: FieldSet, where_fields: FieldSet, delta: i64) -> Result<u64, SqlModelError> {
        let params = field_vals(model, where_fields, &[]);
        let mut args = Vec::with_capacity(params.len() + 1);
        args.push(RowValues::Int(delta));
        args.extend(params);
        self.args_incr_by(model, field, where_fields, &args)
    }

    /// `args` starts with the delta, followed by the where values.
    ///
    /// # Errors
    /// Prepare or execution failures.
    fn args_incr_by(
        &self,
        model: &dyn Model,
        field: FieldSet,
        where_fields: FieldSet,
        args: &[RowValues],
    ) -> Result<u64, SqlModelError> {
        assert!(field.count_ones() == 1, "incr_by needs exactly one field, got {field:#b}");
        let target = StmtTarget::model(model, SqlType::IncrBy, field, where_fields);
        Ok(self.exec_target(target, args)?.rows_affected)
    }

    /// Load the first matching row into the model, reading the where values
    /// from the same model.
    ///
    /// # Errors
    /// [`SqlModelError::NoRows`] when nothing matches, otherwise prepare,
    /// query or conversion failures.
    fn one(&self, model: &mut dyn Model, fields: FieldSet, where_fields: FieldSet) -> Result<(), SqlModelError> {
        let params = field_vals(model, where_fields, &[]);
        self.args_one(model, fields, where_fields, &params)
    }

    /// # Errors
    /// Same as [`Executor::one`].
    fn args_one(
        &self,
        model: &mut dyn Model,
        fields: FieldSet,
        where_fields: FieldSet,
        args: &[RowValues],
    ) -> Result<(), SqlModelError> {
        let shape = Shape {
            table: model.table(),
            columns: model.columns(),
        };
        let target = StmtTarget::model(&shape, SqlType::One, fields, where_fields);
        let mut ptrs = field_ptrs(model, fields);
        self.query_target(target, args, |scanner| scanner.one(&mut ptrs))
    }

    /// Page of matching rows, `offset` rows skipped and at most `count` read.
    ///
    /// # Errors
    /// [`SqlModelError::NoRows`] when nothing matches, otherwise prepare,
    /// query or conversion failures.
    #[allow(clippy::too_many_arguments)]
    fn limit<S: Store + ?Sized>(
        &self,
        store: &mut S,
        model: &dyn Model,
        fields: FieldSet,
        where_fields: FieldSet,
        offset: usize,
        count: usize,
    ) -> Result<usize, SqlModelError> {
        let (a, b) = self.driver().param_limit(to_i64(offset), to_i64(count));
        let params = field_vals(model, where_fields, &[RowValues::Int(a), RowValues::Int(b)]);
        self.args_limit(store, model, fields, where_fields, &params, count)
    }

    /// `args` must end with the two paging values in driver order.
    ///
    /// # Errors
    /// Same as [`Executor::limit`].
    #[allow(clippy::too_many_arguments)]
    fn args_limit<S: Store + ?Sized>(
        &self,
        store: &mut S,
        model: &dyn Model,
        fields: FieldSet,
        where_fields: FieldSet,
        args: &[RowValues],
        count: usize,
    ) -> Result<usize, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::Limit, fields, where_fields);
        self.query_target(target, args, |scanner| scanner.limit(store, count))
    }

    /// Every matching row.
    ///
    /// # Errors
    /// [`SqlModelError::NoRows`] when nothing matches, otherwise prepare,
    /// query or conversion failures.
    fn all<S: Store + ?Sized>(
        &self,
        store: &mut S,
        model: &dyn Model,
        fields: FieldSet,
        where_fields: FieldSet,
    ) -> Result<usize, SqlModelError> {
        let params = field_vals(model, where_fields, &[]);
        self.args_all(store, model, fields, where_fields, &params)
    }

    /// # Errors
    /// Same as [`Executor::all`].
    fn args_all<S: Store + ?Sized>(
        &self,
        store: &mut S,
        model: &dyn Model,
        fields: FieldSet,
        where_fields: FieldSet,
        args: &[RowValues],
    ) -> Result<usize, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::All, fields, where_fields);
        let initial = self.initial_models();
        self.query_target(target, args, |scanner| scanner.all(store, initial))
    }

    /// # Errors
    /// Prepare or query failures.
    fn count(&self, model: &dyn Model, where_fields: FieldSet) -> Result<i64, SqlModelError> {
        let params = field_vals(model, where_fields, &[]);
        self.args_count(model, where_fields, &params)
    }

    /// # Errors
    /// Prepare or query failures.
    fn args_count(&self, model: &dyn Model, where_fields: FieldSet, args: &[RowValues]) -> Result<i64, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::Count, 0, where_fields);
        let mut count = 0i64;
        self.query_target(target, args, |scanner| scanner.one(&mut [&mut count]))?;
        Ok(count)
    }

    /// Whether any row matches.
    ///
    /// # Errors
    /// Prepare or query failures.
    fn exists(&self, model: &dyn Model, where_fields: FieldSet) -> Result<bool, SqlModelError> {
        let params = field_vals(model, where_fields, &[]);
        self.args_exists(model, where_fields, &params)
    }

    /// # Errors
    /// Prepare or query failures.
    fn args_exists(&self, model: &dyn Model, where_fields: FieldSet, args: &[RowValues]) -> Result<bool, SqlModelError> {
        let target = StmtTarget::model(model, SqlType::Exists, 0, where_fields);
        let mut one = 0i64;
        match self.query_target(target, args, |scanner| scanner.one(&mut [&mut one])) {
            Ok(()) => Ok(true),
            Err(SqlModelError::NoRows) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run raw SQL as DML. The dialect rewrite applies, the statement is not
    /// cached.
    ///
    /// # Errors
    /// Prepare or execution failures.
    fn exec(&self, sql: &str, res: ResultType, args: &[RowValues]) -> Result<i64, SqlModelError> {
        Ok(self.exec_target(StmtTarget::Sql(sql), args)?.resolve(res))
    }

    /// Raw SQL DML returning the number of changed rows.
    ///
    /// # Errors
    /// Prepare or execution failures.
    fn exec_update(&self, sql: &str, args: &[RowValues]) -> Result<u64, SqlModelError> {
        Ok(self.exec_target(StmtTarget::Sql(sql), args)?.rows_affected)
    }

    /// Run raw SQL as a query.
    ///
    /// # Errors
    /// Prepare or query failures, and whatever `scan` returns.
    fn query<R, F>(&self, sql: &str, args: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        self.query_target(StmtTarget::Sql(sql), args, scan)
    }

    /// Run registered SQL as DML.
    ///
    /// # Errors
    /// [`SqlModelError::ConfigError`] for an unregistered id, otherwise
    /// prepare or execution failures.
    fn exec_by_id(&self, id: SqlId, res: ResultType, args: &[RowValues]) -> Result<i64, SqlModelError> {
        Ok(self.exec_target(StmtTarget::ById(id), args)?.resolve(res))
    }

    /// # Errors
    /// Same as [`Executor::exec_by_id`].
    fn update_by_id(&self, id: SqlId, args: &[RowValues]) -> Result<u64, SqlModelError> {
        Ok(self.exec_target(StmtTarget::ById(id), args)?.rows_affected)
    }

    /// Run registered SQL as a query.
    ///
    /// # Errors
    /// [`SqlModelError::ConfigError`] for an unregistered id, otherwise
    /// prepare or query failures, and whatever `scan` returns.
    fn query_by_id<R, F>(&self, id: SqlId, args: &[RowValues], scan: F) -> Result<R, SqlModelError>
    where
        F: FnOnce(Scanner<'_>) -> Result<R, SqlModelError>,
    {
        self.query_target(StmtTarget::ById(id), args, scan)
    }

    /// Key named by a unique violation in `err`.
    fn duplicate_key(&self, err: &SqlModelError) -> Option<String> {
        self.driver().duplicate_key(err)
    }

    /// Key named by a foreign key violation in `err`.
    fn foreign_key(&self, err: &SqlModelError) -> Option<String> {
        self.driver().foreign_key(err)
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Table identity of a model whose fields are mutably borrowed for scanning.
struct Shape {
    table: &'static str,
    columns: &'static [&'static str],
}

impl Model for Shape {
    fn table(&self) -> &'static str {
        self.table
    }

    fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    fn vals(&self, _fields: FieldSet, _vals: &mut Vec<RowValues>) {}

    fn ptrs<'a>(&'a mut self, _fields: FieldSet, _ptrs: &mut Vec<&'a mut dyn crate::types::ScanTarget>) {}
}
