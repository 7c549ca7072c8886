//! Fluent statement builder
//!
//! A [`QueryBuilder`] borrows an execution port, accumulates one statement and
//! keeps the last error it saw in a sticky slot. Verbs never panic and never
//! return errors directly; callers check [`QueryBuilder::has_error`] or turn
//! the slot into a `Result` with [`QueryBuilder::compile`].

pub mod common;
pub mod condition;
pub mod ddl;
pub mod delete;
pub mod insert;
pub mod prepare;
pub mod select;
pub mod statement;
pub mod update;

pub use common::{
    add_semicolon, CompiledQuery, InsertData, IntoInsertData, IntoJoinOn, IntoJoinType,
    IntoSortSpecs, IntoUpdateData, JoinOn, JoinType, SortDirection, SortSpec,
};
pub use condition::{Condition, Conditions, Fragment, IntoCondition, IntoConditions, IntoOperand, Operand};
pub use prepare::{col, table, FieldRef, IntoFields, IntoTable, TableRef};
pub use statement::{SetOperator, Statement, StatementKind};

use crate::config::BuilderOptions;
use crate::dialect::Dialect;
use crate::executor::{ConnectionPool, Row};
use crate::operator::Operator;
use crate::{Error, Result, Value};
use common::count_placeholders;
use prepare::prepare_field_list;
use std::fmt;
use tracing::{debug, warn};

/// Fluent SQL statement builder bound to one execution port
pub struct QueryBuilder<'a, P: ConnectionPool> {
    pub(crate) pool: &'a P,
    dialect: Dialect,
    options: BuilderOptions,
    pub(crate) statement: Statement,
    pub(crate) error: Option<Error>,
    pub(crate) last_fields: Vec<FieldRef>,
    pub(crate) result: Vec<Row>,
    pub(crate) row_count: Option<usize>,
}

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Create a builder whose dialect follows the pool's driver name
    pub fn new(pool: &'a P) -> Self {
        Self::with_options(pool, BuilderOptions::default())
    }

    pub fn with_options(pool: &'a P, options: BuilderOptions) -> Self {
        Self {
            pool,
            dialect: Dialect::from_driver_name(pool.driver_name()),
            options,
            statement: Statement::new(),
            error: None,
            last_fields: Vec::new(),
            result: Vec::new(),
            row_count: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Clear statement, parameters, error and results. The pool and dialect stay.
    pub fn reset(&mut self) -> &mut Self {
        self.statement = Statement::new();
        self.error = None;
        self.last_fields.clear();
        self.result.clear();
        self.row_count = None;
        self
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The sticky error's message, or an empty string
    pub fn error_message(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// Record a caller-supplied error. An empty message clears the slot.
    pub fn set_error(&mut self, message: &str) -> &mut Self {
        if message.is_empty() {
            self.error = None;
        } else {
            self.record_error(Error::custom(message));
        }
        self
    }

    /// The sticky error as a `Result`
    pub fn into_result(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub(crate) fn record_error(&mut self, err: Error) {
        if self.options.log_errors {
            warn!(error = %err, "query builder error");
        } else {
            debug!(error = %err, "query builder error");
        }
        self.error = Some(err);
    }

    /// Run a verb that extends the current statement. Nothing happens while
    /// an error is recorded.
    pub(crate) fn apply<F>(&mut self, verb: F) -> &mut Self
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.error.is_some() {
            return self;
        }
        if let Err(err) = verb(self) {
            self.record_error(err);
        }
        self
    }

    /// Like [`apply`](Self::apply), for verbs that add a clause to a SELECT
    /// section and therefore need one to exist
    pub(crate) fn apply_clause<F>(&mut self, context: &'static str, verb: F) -> &mut Self
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.apply(|qb| {
            if qb.statement.pending().is_some() {
                return Err(Error::missing_select(context));
            }
            verb(qb)
        })
    }

    /// Start a new statement. Validation runs first; on success the builder
    /// is reset, on failure the previous statement is left untouched.
    pub(crate) fn start<F>(&mut self, kind: StatementKind, build: F) -> &mut Self
    where
        F: FnOnce(&Self) -> Result<(String, Vec<Value>)>,
    {
        match build(self) {
            Ok((sql, params)) => {
                self.reset();
                self.statement.start(kind, sql);
                self.statement.extend_params(params);
            }
            Err(err) => self.record_error(err),
        }
        self
    }

    /// Replace the statement with caller-written SQL and parameters
    pub fn raw<I, V>(&mut self, sql: &str, params: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let params: Vec<Value> = params.into_iter().map(Into::into).collect();
        self.start(StatementKind::Raw, |_| {
            if sql.trim().is_empty() {
                return Err(Error::empty_input("sql", "QueryBuilder::raw"));
            }
            if count_placeholders(sql) != params.len() {
                return Err(Error::invalid_type(
                    "params",
                    "QueryBuilder::raw",
                    "one value per ? placeholder",
                ));
            }
            Ok((sql.trim().to_string(), params))
        })
    }

    /// Add a WHERE clause
    pub fn where_(&mut self, conditions: impl IntoConditions) -> &mut Self {
        self.where_with(conditions, "")
    }

    /// Add a WHERE clause followed by extra SQL such as `ORDER BY id`
    pub fn where_with(&mut self, conditions: impl IntoConditions, extra: &str) -> &mut Self {
        let conditions = conditions.into_conditions();
        self.apply_clause("QueryBuilder::where_", |qb| {
            if conditions.is_empty() {
                return Err(Error::empty_input("where", "QueryBuilder::where_"));
            }
            let fragment = conditions.compile()?;
            let extra = extra.trim();
            if extra.is_empty() {
                qb.statement.append(&format!(" WHERE {}", fragment.sql));
            } else {
                qb.statement.append(&format!(" WHERE {} {extra}", fragment.sql));
            }
            qb.statement.extend_params(fragment.params);
            Ok(())
        })
    }

    pub fn having(&mut self, conditions: impl IntoConditions) -> &mut Self {
        let conditions = conditions.into_conditions();
        self.apply_clause("QueryBuilder::having", |qb| {
            if conditions.is_empty() {
                return Err(Error::empty_input("having", "QueryBuilder::having"));
            }
            let fragment = conditions.compile()?;
            qb.statement.append(&format!(" HAVING {}", fragment.sql));
            qb.statement.extend_params(fragment.params);
            Ok(())
        })
    }

    /// `WHERE (field LIKE ?)`
    pub fn like(&mut self, field: &str, pattern: impl Into<Value>) -> &mut Self {
        self.pattern_match(field, Operator::Like, pattern.into(), "QueryBuilder::like")
    }

    /// `WHERE (field NOT LIKE ?)`
    pub fn not_like(&mut self, field: &str, pattern: impl Into<Value>) -> &mut Self {
        self.pattern_match(field, Operator::NotLike, pattern.into(), "QueryBuilder::not_like")
    }

    fn pattern_match(
        &mut self,
        field: &str,
        operator: Operator,
        pattern: Value,
        context: &'static str,
    ) -> &mut Self {
        if field.trim().is_empty() {
            return self.apply(|_| Err(Error::empty_input("field", context)));
        }
        self.where_((field, operator, pattern))
    }

    pub fn is_null(&mut self, field: &str) -> &mut Self {
        if field.trim().is_empty() {
            return self.apply(|_| Err(Error::empty_input("field", "QueryBuilder::is_null")));
        }
        self.where_(Condition::is_null(field))
    }

    pub fn is_not_null(&mut self, field: &str) -> &mut Self {
        if field.trim().is_empty() {
            return self.apply(|_| Err(Error::empty_input("field", "QueryBuilder::is_not_null")));
        }
        self.where_(Condition::is_not_null(field))
    }

    /// Alias for [`is_not_null`](Self::is_not_null)
    pub fn not_null(&mut self, field: &str) -> &mut Self {
        self.is_not_null(field)
    }

    /// Append `LIMIT n`. Skipped for DELETE when the dialect forbids it.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.apply_clause("QueryBuilder::limit", |qb| {
            if qb.statement.is_delete() && !qb.dialect.allows_delete_limit() {
                debug!(dialect = %qb.dialect, "LIMIT on DELETE skipped");
                return Ok(());
            }
            qb.statement.append(&format!(" LIMIT {limit}"));
            Ok(())
        })
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.apply_clause("QueryBuilder::offset", |qb| {
            qb.statement.append(&format!(" OFFSET {offset}"));
            Ok(())
        })
    }

    /// Append `ORDER BY`. Accepts `"field"`, `"field desc"`, `(field, dir)` or
    /// a list of those.
    pub fn order_by(&mut self, specs: impl IntoSortSpecs) -> &mut Self {
        let specs = specs.into_sort_specs();
        self.apply_clause("QueryBuilder::order_by", |qb| {
            if specs.is_empty() || specs.iter().any(|s| s.field.trim().is_empty()) {
                return Err(Error::empty_input("field", "QueryBuilder::order_by"));
            }
            let rendered = specs
                .iter()
                .map(|spec| Ok(format!("{} {}", FieldRef::parse(&spec.field).render()?, spec.direction)))
                .collect::<Result<Vec<_>>>()?;
            qb.statement.append(&format!(" ORDER BY {}", rendered.join(", ")));
            Ok(())
        })
    }

    pub fn order_by_asc(&mut self, field: &str) -> &mut Self {
        self.order_by((field, SortDirection::Asc))
    }

    pub fn order_by_desc(&mut self, field: &str) -> &mut Self {
        self.order_by((field, SortDirection::Desc))
    }

    pub fn group_by(&mut self, fields: impl IntoFields) -> &mut Self {
        let fields = fields.into_fields();
        self.apply_clause("QueryBuilder::group_by", |qb| {
            if fields.is_empty() {
                return Err(Error::empty_input("field", "QueryBuilder::group_by"));
            }
            let list = prepare_field_list(&fields)?;
            qb.statement.append(&format!(" GROUP BY {list}"));
            Ok(())
        })
    }

    /// The statement text. With `with_values`, each placeholder is replaced
    /// by its parameter rendered as a literal; that form is for display only.
    pub fn to_sql(&self, with_values: bool) -> String {
        let sql = self.statement.render();
        if !with_values || self.statement.params().is_empty() {
            return sql;
        }
        let mut params = self.statement.params().iter();
        let mut out = String::with_capacity(sql.len());
        for ch in sql.chars() {
            match (ch, params.as_slice().is_empty()) {
                ('?', false) => {
                    if let Some(value) = params.next() {
                        out.push_str(&value.to_sql_literal());
                    }
                }
                _ => out.push(ch),
            }
        }
        out
    }

    /// Positional parameters, in placeholder order
    pub fn parameters(&self) -> &[Value] {
        self.statement.params()
    }

    /// Whether the statement joins several SELECT sections
    pub fn is_compound(&self) -> bool {
        self.statement.is_compound()
    }

    /// The statement ready for execution, or the recorded error
    pub fn compile(&self) -> Result<CompiledQuery> {
        self.into_result()?;
        if self.statement.is_empty() {
            return Err(Error::empty_input("sql", "QueryBuilder::compile"));
        }
        if self.statement.pending().is_some() {
            return Err(Error::missing_select("QueryBuilder::compile"));
        }
        Ok(CompiledQuery {
            sql: add_semicolon(&self.statement.render()),
            params: self.statement.params().to_vec(),
        })
    }

    /// Rows fetched by the last terminal verb
    pub fn result(&self) -> &[Row] {
        &self.result
    }

    /// Rows fetched (or affected) by the last terminal verb; `None` before any
    pub fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    pub fn first(&self) -> Option<&Row> {
        self.result.first()
    }

    pub fn last(&self) -> Option<&Row> {
        self.result.last()
    }
}

impl<P: ConnectionPool> fmt::Display for QueryBuilder<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql(true))
    }
}

impl<P: ConnectionPool> fmt::Debug for QueryBuilder<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect)
            .field("sql", &self.statement.render())
            .field("params", &self.statement.params())
            .field("error", &self.error)
            .finish()
    }
}
