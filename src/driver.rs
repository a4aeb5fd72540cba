//! SQL dialects.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::DriverKind;
use crate::error::SqlModelError;
use crate::translation::number_placeholders;

/// Dialect specific pieces of SQL generation and error inspection.
pub trait Driver: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Final rewrite applied to every SQL string before it is prepared.
    fn prepare<'a>(&self, sql: &'a str) -> Cow<'a, str>;

    /// Paging clause appended to limit queries; takes two parameters.
    fn sql_limit(&self) -> &'static str;

    /// Order the paging parameters as [`Driver::sql_limit`] expects them.
    fn param_limit(&self, offset: i64, count: i64) -> (i64, i64);

    /// Key name the dialect reports for primary key violations.
    fn primary_key(&self) -> &'static str;

    /// Key named by a unique violation, `None` if `err` is something else.
    fn duplicate_key(&self, err: &SqlModelError) -> Option<String>;

    /// Key named by a foreign key violation, `None` if `err` is something else.
    fn foreign_key(&self, err: &SqlModelError) -> Option<String>;
}

impl DriverKind {
    /// Instantiate the dialect.
    #[must_use]
    pub fn driver(self) -> Box<dyn Driver> {
        match self {
            DriverKind::Sqlite => Box::new(Sqlite),
            DriverKind::Mysql => Box::new(Mysql),
            DriverKind::Postgres => Box::new(Postgres),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

static SQLITE_UNIQUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"UNIQUE constraint failed: ([^\s]+)").expect("valid regex")
});

impl Driver for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn prepare<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(sql)
    }

    fn sql_limit(&self) -> &'static str {
        "LIMIT ?, ?"
    }

    fn param_limit(&self, offset: i64, count: i64) -> (i64, i64) {
        (offset, count)
    }

    fn primary_key(&self) -> &'static str {
        "PRIMARY"
    }

    fn duplicate_key(&self, err: &SqlModelError) -> Option<String> {
        let msg = err.to_string();
        let cols = SQLITE_UNIQUE.captures(&msg)?.get(1)?.as_str();
        if cols.contains(',') {
            return Some(self.primary_key().to_string());
        }
        // "table.column"
        Some(cols.rsplit('.').next().unwrap_or(cols).to_string())
    }

    fn foreign_key(&self, err: &SqlModelError) -> Option<String> {
        // sqlite does not say which key failed
        err.to_string()
            .contains("FOREIGN KEY constraint failed")
            .then(String::new)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mysql;

static MYSQL_DUPLICATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duplicate entry .* for key '([^']+)'").expect("valid regex")
});

static MYSQL_FOREIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"FOREIGN KEY \(`?([^`)]+)`?\)").expect("valid regex")
});

impl Driver for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn prepare<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(sql)
    }

    fn sql_limit(&self) -> &'static str {
        "LIMIT ?, ?"
    }

    fn param_limit(&self, offset: i64, count: i64) -> (i64, i64) {
        (offset, count)
    }

    fn primary_key(&self) -> &'static str {
        "PRIMARY"
    }

    fn duplicate_key(&self, err: &SqlModelError) -> Option<String> {
        let msg = err.to_string();
        let key = MYSQL_DUPLICATE.captures(&msg)?.get(1)?.as_str();
        // 8.0 reports "table.key"
        Some(key.rsplit('.').next().unwrap_or(key).to_string())
    }

    fn foreign_key(&self, err: &SqlModelError) -> Option<String> {
        let msg = err.to_string();
        if !msg.contains("foreign key constraint fails") {
            return None;
        }
        Some(
            MYSQL_FOREIGN
                .captures(&msg)
                .and_then(|c| c.get(1))
                .map_or_else(String::new, |m| m.as_str().to_string()),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

static PG_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bLIMIT\s+\?\s*,\s*\?").expect("valid regex")
});

static PG_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Key \(([^)]+)\)=").expect("valid regex"));

static PG_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"constraint "([^"]+)""#).expect("valid regex"));

impl Postgres {
    fn key(msg: &str) -> String {
        PG_KEY
            .captures(msg)
            .or_else(|| PG_CONSTRAINT.captures(msg))
            .and_then(|c| c.get(1))
            .map_or_else(String::new, |m| m.as_str().to_string())
    }
}

impl Driver for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn prepare<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match PG_LIMIT.replace_all(sql, "LIMIT ? OFFSET ?") {
            Cow::Borrowed(_) => number_placeholders(sql),
            Cow::Owned(rewritten) => Cow::Owned(number_placeholders(&rewritten).into_owned()),
        }
    }

    fn sql_limit(&self) -> &'static str {
        "LIMIT ? OFFSET ?"
    }

    fn param_limit(&self, offset: i64, count: i64) -> (i64, i64) {
        (count, offset)
    }

    fn primary_key(&self) -> &'static str {
        "PRIMARY"
    }

    fn duplicate_key(&self, err: &SqlModelError) -> Option<String> {
        let msg = err.to_string();
        if !msg.contains("duplicate key") {
            return None;
        }
        let key = Self::key(&msg);
        if key.contains(',') || key.ends_with("_pkey") {
            return Some(self.primary_key().to_string());
        }
        Some(key)
    }

    fn foreign_key(&self, err: &SqlModelError) -> Option<String> {
        let msg = err.to_string();
        msg.contains("foreign key").then(|| Self::key(&msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_err(msg: &str) -> SqlModelError {
        SqlModelError::ExecutionError(msg.to_string())
    }

    #[test]
    fn postgres_rewrites_limit_and_placeholders() {
        let sql = "SELECT id FROM t WHERE age=? LIMIT ?, ?";
        assert_eq!(
            Postgres.prepare(sql),
            "SELECT id FROM t WHERE age=$1 LIMIT $2 OFFSET $3"
        );
        assert_eq!(Postgres.param_limit(20, 10), (10, 20));
    }

    #[test]
    fn sqlite_leaves_sql_alone() {
        let sql = "SELECT id FROM t LIMIT ?, ?";
        assert!(matches!(Sqlite.prepare(sql), Cow::Borrowed(_)));
        assert_eq!(Sqlite.param_limit(20, 10), (20, 10));
    }

    #[test]
    fn mysql_extracts_keys() {
        let dup = exec_err("Error 1062: Duplicate entry 'bob' for key 'user.name'");
        assert_eq!(Mysql.duplicate_key(&dup).as_deref(), Some("name"));
        let fk = exec_err(
            "Error 1452: Cannot add or update a child row: a foreign key constraint fails \
             (`db`.`post`, CONSTRAINT `fk` FOREIGN KEY (`user_id`) REFERENCES `user` (`id`))",
        );
        assert_eq!(Mysql.foreign_key(&fk).as_deref(), Some("user_id"));
        assert!(Mysql.duplicate_key(&fk).is_none());
    }

    #[test]
    fn sqlite_extracts_unique_column() {
        let err = exec_err("UNIQUE constraint failed: user.name");
        assert_eq!(Sqlite.duplicate_key(&err).as_deref(), Some("name"));
        let err = exec_err("UNIQUE constraint failed: user.a, user.b");
        assert_eq!(Sqlite.duplicate_key(&err).as_deref(), Some("PRIMARY"));
        assert!(Sqlite.duplicate_key(&exec_err("no such table: x")).is_none());
    }

    #[test]
    fn postgres_extracts_keys() {
        let err = exec_err(
            "duplicate key value violates unique constraint \"user_name_key\" \
             DETAIL: Key (name)=(bob) already exists.",
        );
        assert_eq!(Postgres.duplicate_key(&err).as_deref(), Some("name"));
        let err = exec_err("insert or update on table \"post\" violates foreign key constraint \"post_user_fk\"");
        assert_eq!(Postgres.foreign_key(&err).as_deref(), Some("post_user_fk"));
    }
}
