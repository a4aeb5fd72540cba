//! Per-table SQL generation and statement lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::backend::Preparer;
use crate::cache::Cache;
use crate::cols::Cols;
use crate::driver::Driver;
use crate::error::SqlModelError;
use crate::fieldset::{self, FieldSet, MAX_NUMFIELDS, SqlType};
use crate::model::Model;

/// Memoized field-set to [`Cols`] renderings.
#[derive(Debug, Default)]
struct ColsMemo(RwLock<HashMap<FieldSet, Arc<Cols>>>);

impl ColsMemo {
    fn get_or_build(&self, fields: FieldSet, build: impl FnOnce() -> Cols) -> Arc<Cols> {
        if let Some(cols) = self.0.read().unwrap_or_else(PoisonError::into_inner).get(&fields) {
            return Arc::clone(cols);
        }
        let mut memo = self.0.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(memo.entry(fields).or_insert_with(|| Arc::new(build())))
    }
}

/// One mapped table: its columns, SQL builders and statement cache.
pub struct Table<S> {
    name: String,
    columns: Vec<String>,
    cols: ColsMemo,
    tab_cols: ColsMemo,
    cache: Cache<S>,
}

impl<S> fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl<S> Table<S> {
    /// # Panics
    /// When more than [`MAX_NUMFIELDS`] columns are given.
    pub fn new<I, C>(name: impl Into<String>, columns: I, log_sql: bool) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let name = name.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        assert!(
            columns.len() <= MAX_NUMFIELDS,
            "table {name} declares {} fields, at most {MAX_NUMFIELDS} are supported",
            columns.len()
        );
        Self {
            name,
            columns,
            cols: ColsMemo::default(),
            tab_cols: ColsMemo::default(),
            cache: Cache::new(log_sql),
        }
    }

    /// Table for a model's declaration.
    ///
    /// # Panics
    /// When the model declares more than [`MAX_NUMFIELDS`] fields.
    pub fn for_model(model: &dyn Model, log_sql: bool) -> Self {
        Self::new(model.table(), model.columns().iter().copied(), log_sql)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn cache(&self) -> &Cache<S> {
        &self.cache
    }

    fn selected(&self, fields: FieldSet, prefixed: bool) -> Vec<String> {
        fieldset::indexes(fields)
            .filter_map(|i| self.columns.get(i))
            .map(|col| {
                if prefixed {
                    format!("{}.{col}", self.name)
                } else {
                    col.clone()
                }
            })
            .collect()
    }

    /// Projection of `fields`, memoized per field-set.
    pub fn cols(&self, fields: FieldSet) -> Arc<Cols> {
        self.cols
            .get_or_build(fields, || Cols::new(self.selected(fields, false)))
    }

    /// Projection of `fields` with every column qualified by the table name.
    pub fn tab_cols(&self, fields: FieldSet) -> Arc<Cols> {
        self.tab_cols
            .get_or_build(fields, || Cols::new(self.selected(fields, true)))
    }

    /// Name of the single column in `field`.
    ///
    /// # Panics
    /// When `field` is not a single declared field.
    #[must_use]
    pub fn col(&self, field: FieldSet) -> &str {
        assert!(field.count_ones() == 1, "col needs exactly one field, got {field:#b}");
        let index = field.trailing_zeros() as usize;
        match self.columns.get(index) {
            Some(col) => col,
            None => panic!("field {field:#b} is not declared on {}", self.name),
        }
    }

    /// `table.column` for the single column in `field`.
    #[must_use]
    pub fn tab_col(&self, field: FieldSet) -> String {
        format!("{}.{}", self.name, self.col(field))
    }

    /// `WHERE a=? AND b=?`, or empty for no fields.
    #[must_use]
    pub fn where_clause(&self, where_fields: FieldSet) -> String {
        where_of(&self.cols(where_fields))
    }

    /// Like [`Table::where_clause`] with table-qualified columns.
    #[must_use]
    pub fn tab_where(&self, where_fields: FieldSet) -> String {
        where_of(&self.tab_cols(where_fields))
    }

    fn with_where(&self, mut sql: String, where_fields: FieldSet) -> String {
        let clause = self.where_clause(where_fields);
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause);
        }
        sql
    }

    #[must_use]
    pub fn sql_insert(&self, fields: FieldSet) -> String {
        let cols = self.cols(fields);
        format!(
            "INSERT INTO {}({}) VALUES({})",
            self.name,
            cols,
            cols.only_param()
        )
    }

    #[must_use]
    pub fn sql_update(&self, fields: FieldSet, where_fields: FieldSet) -> String {
        let sql = format!("UPDATE {} SET {}", self.name, self.cols(fields).paramed());
        self.with_where(sql, where_fields)
    }

    #[must_use]
    pub fn sql_delete(&self, where_fields: FieldSet) -> String {
        self.with_where(format!("DELETE FROM {}", self.name), where_fields)
    }

    #[must_use]
    pub fn sql_limit(&self, fields: FieldSet, where_fields: FieldSet, driver: &dyn Driver) -> String {
        let mut sql = self.sql_all(fields, where_fields);
        sql.push(' ');
        sql.push_str(driver.sql_limit());
        sql
    }

    #[must_use]
    pub fn sql_one(&self, fields: FieldSet, where_fields: FieldSet) -> String {
        let mut sql = self.sql_all(fields, where_fields);
        sql.push_str(" LIMIT 1");
        sql
    }

    #[must_use]
    pub fn sql_all(&self, fields: FieldSet, where_fields: FieldSet) -> String {
        let sql = format!("SELECT {} FROM {}", self.cols(fields), self.name);
        self.with_where(sql, where_fields)
    }

    #[must_use]
    pub fn sql_count(&self, where_fields: FieldSet) -> String {
        self.with_where(format!("SELECT COUNT(*) FROM {}", self.name), where_fields)
    }

    #[must_use]
    pub fn sql_exists(&self, where_fields: FieldSet) -> String {
        let mut sql = self.with_where(format!("SELECT 1 FROM {}", self.name), where_fields);
        sql.push_str(" LIMIT 1");
        sql
    }

    /// `UPDATE t SET c=c+? WHERE ..` for exactly one field.
    ///
    /// # Panics
    /// When `field` selects anything but exactly one field.
    #[must_use]
    pub fn sql_incr_by(&self, field: FieldSet, where_fields: FieldSet) -> String {
        let col = self.col(field);
        let sql = format!("UPDATE {} SET {col}={col}+?", self.name);
        self.with_where(sql, where_fields)
    }

    /// Canonical SQL of `kind` over the given field-sets, before the
    /// dialect rewrite.
    ///
    /// # Panics
    /// For [`SqlType::ById`], which has no model SQL.
    #[must_use]
    pub fn build(&self, kind: SqlType, fields: FieldSet, where_fields: FieldSet, driver: &dyn Driver) -> String {
        match kind {
            SqlType::Insert => self.sql_insert(fields),
            SqlType::Delete => self.sql_delete(where_fields),
            SqlType::Update => self.sql_update(fields, where_fields),
            SqlType::IncrBy => self.sql_incr_by(fields, where_fields),
            SqlType::Limit => self.sql_limit(fields, where_fields, driver),
            SqlType::One => self.sql_one(fields, where_fields),
            SqlType::All => self.sql_all(fields, where_fields),
            SqlType::Count => self.sql_count(where_fields),
            SqlType::Exists => self.sql_exists(where_fields),
            SqlType::ById => panic!("ById statements are not generated from field-sets"),
        }
    }

    /// Cache identity of `kind` over the given field-sets.
    ///
    /// # Panics
    /// When a field-set selects undeclared fields.
    #[must_use]
    pub fn identity(&self, kind: SqlType, fields: FieldSet, where_fields: FieldSet) -> u64 {
        fieldset::identity(kind, self.num_fields(), fields, where_fields)
    }

    /// Dialect-ready SQL for `kind`, built once and cached. Used by
    /// transactions, which prepare per call.
    pub fn sql(&self, driver: &dyn Driver, kind: SqlType, fields: FieldSet, where_fields: FieldSet) -> Arc<str> {
        let id = self.identity(kind, fields, where_fields);
        self.cache.sql_or_build(id, || {
            driver
                .prepare(&self.build(kind, fields, where_fields, driver))
                .into_owned()
        })
    }
}

impl<S: Clone> Table<S> {
    /// Prepared statement for `kind`, created on first use and shared after.
    ///
    /// # Errors
    /// Propagates prepare failures; the next call retries.
    pub fn stmt<P>(
        &self,
        preparer: &P,
        driver: &dyn Driver,
        kind: SqlType,
        fields: FieldSet,
        where_fields: FieldSet,
    ) -> Result<S, SqlModelError>
    where
        P: Preparer<Stmt = S> + ?Sized,
    {
        let id = self.identity(kind, fields, where_fields);
        self.cache.get_or_prepare(preparer, id, || {
            Ok(driver
                .prepare(&self.build(kind, fields, where_fields, driver))
                .into_owned())
        })
    }
}

fn where_of(cols: &Cols) -> String {
    if cols.is_empty() {
        return String::new();
    }
    format!("WHERE {}", cols.join("=?", " AND "))
}
