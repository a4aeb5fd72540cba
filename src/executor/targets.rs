use crate::fieldset::{FieldSet, SqlType};
use crate::model::Model;
use crate::sqlid::SqlId;

/// What a call runs: a generated model statement, a registered statement,
/// or raw SQL.
#[derive(Clone, Copy)]
pub enum StmtTarget<'a> {
    Model {
        model: &'a dyn Model,
        kind: SqlType,
        fields: FieldSet,
        where_fields: FieldSet,
    },
    ById(SqlId),
    /// Prepared per call, never cached.
    Sql(&'a str),
}

impl<'a> StmtTarget<'a> {
    #[must_use]
    pub fn model(model: &'a dyn Model, kind: SqlType, fields: FieldSet, where_fields: FieldSet) -> Self {
        StmtTarget::Model {
            model,
            kind,
            fields,
            where_fields,
        }
    }
}

impl std::fmt::Debug for StmtTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StmtTarget::Model {
                model,
                kind,
                fields,
                where_fields,
            } => f
                .debug_struct("Model")
                .field("table", &model.table())
                .field("kind", kind)
                .field("fields", &format_args!("{fields:#b}"))
                .field("where_fields", &format_args!("{where_fields:#b}"))
                .finish(),
            StmtTarget::ById(id) => f.debug_tuple("ById").field(id).finish(),
            StmtTarget::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
        }
    }
}
