//! Identifier, alias and table preparation
//!
//! Caller input is classified once, when it is converted into a [`FieldRef`]
//! or [`TableRef`]. Rendering then only has to quote what is an identifier and
//! pass through what is an expression.

use crate::{Error, Result};

const PREPARE_CONTEXT: &str = "QueryBuilder::prepare_field";

/// Characters that mark a table argument as a computed expression
const TABLE_EXPRESSION_MARKERS: &[&str] = &["+", "-", "*", "/", "%", "(", ")", "||"];

/// Quote one identifier part with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.trim().replace('`', "``"))
}

/// Quote a possibly qualified identifier: `t.col` becomes `` `t`.`col` ``
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Locate a case-insensitive ` as ` separator, returning `(body, alias)`
pub(crate) fn split_alias(item: &str) -> Option<(&str, &str)> {
    let lowered = item.to_ascii_lowercase();
    let pos = lowered.rfind(" as ")?;
    let body = item[..pos].trim();
    let alias = item[pos + 4..].trim();
    if body.is_empty() || alias.is_empty() {
        None
    } else {
        Some((body, alias))
    }
}

/// Split a comma separated list of items.
///
/// Without any `AS` token all whitespace is dropped first. With one, each
/// item keeps its inner spacing so aliases such as `Highest salary` survive.
pub fn split_aliases(items: &str) -> Vec<String> {
    if !items.contains(',') {
        return vec![items.trim().to_string()];
    }
    let has_alias = items.to_ascii_lowercase().contains(" as ");
    items
        .split(',')
        .map(|item| {
            if has_alias {
                item.trim().to_string()
            } else {
                item.split_whitespace().collect::<String>()
            }
        })
        .collect()
}

fn is_expression_field(field: &str) -> bool {
    field.contains('(') || field.contains(')') || field.contains('*')
}

fn unquote_alias(alias: &str) -> &str {
    alias.trim().trim_matches(|c| c == '`' || c == '\'' || c == '"')
}

/// A field reference in a projection, condition, GROUP BY or ORDER BY
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// `*`
    Star,
    /// A plain or qualified column, quoted on render
    Column(String),
    /// A raw expression such as a function call, emitted verbatim
    Expression(String),
    /// Any field with an `AS` alias
    Aliased { field: Box<FieldRef>, alias: String },
}

impl FieldRef {
    /// Classify a single field string
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        if field == "*" {
            return FieldRef::Star;
        }
        if let Some((body, alias)) = split_alias(field) {
            return FieldRef::parse(body).as_alias(alias);
        }
        if is_expression_field(field) {
            FieldRef::Expression(field.to_string())
        } else {
            FieldRef::Column(field.to_string())
        }
    }

    /// A raw expression, never quoted
    pub fn raw(expression: impl Into<String>) -> Self {
        FieldRef::Expression(expression.into())
    }

    /// Attach an alias, replacing any existing one
    pub fn as_alias(self, alias: &str) -> Self {
        let field = match self {
            FieldRef::Aliased { field, .. } => field,
            other => Box::new(other),
        };
        FieldRef::Aliased {
            field,
            alias: unquote_alias(alias).to_string(),
        }
    }

    /// Render as SQL
    pub fn render(&self) -> Result<String> {
        match self {
            FieldRef::Star => Ok("*".to_string()),
            FieldRef::Column(name) if name.trim().is_empty() => {
                Err(Error::empty_input("field", PREPARE_CONTEXT))
            }
            FieldRef::Column(name) => Ok(quote_qualified(name)),
            FieldRef::Expression(expr) if expr.trim().is_empty() => {
                Err(Error::empty_input("field", PREPARE_CONTEXT))
            }
            FieldRef::Expression(expr) => Ok(expr.trim().to_string()),
            FieldRef::Aliased { field, alias } => {
                Ok(format!("{} AS {}", field.render()?, quote_identifier(alias)))
            }
        }
    }
}

impl From<&str> for FieldRef {
    fn from(field: &str) -> Self {
        FieldRef::parse(field)
    }
}

impl From<String> for FieldRef {
    fn from(field: String) -> Self {
        FieldRef::parse(&field)
    }
}

/// Create an explicit column reference
///
/// ```
/// use quarry_core::col;
///
/// assert_eq!(col("u.id").render().unwrap(), "`u`.`id`");
/// assert_eq!(col("name").as_alias("n").render().unwrap(), "`name` AS `n`");
/// ```
pub fn col(name: &str) -> FieldRef {
    FieldRef::Column(name.trim().to_string())
}

/// Render a field list joined with `, `
pub fn prepare_field_list(fields: &[FieldRef]) -> Result<String> {
    if fields.is_empty() {
        return Err(Error::empty_input("fields", "QueryBuilder::prepare_field_list"));
    }
    let rendered = fields
        .iter()
        .map(FieldRef::render)
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

/// Trait for types that can be converted to a list of fields
pub trait IntoFields {
    fn into_fields(self) -> Vec<FieldRef>;
}

impl IntoFields for &str {
    fn into_fields(self) -> Vec<FieldRef> {
        if self.trim().is_empty() {
            return Vec::new();
        }
        split_aliases(self).iter().map(|f| FieldRef::parse(f)).collect()
    }
}

impl IntoFields for String {
    fn into_fields(self) -> Vec<FieldRef> {
        self.as_str().into_fields()
    }
}

impl IntoFields for &String {
    fn into_fields(self) -> Vec<FieldRef> {
        self.as_str().into_fields()
    }
}

impl IntoFields for FieldRef {
    fn into_fields(self) -> Vec<FieldRef> {
        vec![self]
    }
}

impl IntoFields for Vec<FieldRef> {
    fn into_fields(self) -> Vec<FieldRef> {
        self
    }
}

impl IntoFields for Vec<&str> {
    fn into_fields(self) -> Vec<FieldRef> {
        self.into_iter().map(FieldRef::parse).collect()
    }
}

impl IntoFields for Vec<String> {
    fn into_fields(self) -> Vec<FieldRef> {
        self.iter().map(|f| FieldRef::parse(f)).collect()
    }
}

impl<const N: usize> IntoFields for [&str; N] {
    fn into_fields(self) -> Vec<FieldRef> {
        self.into_iter().map(FieldRef::parse).collect()
    }
}

impl<const N: usize> IntoFields for [FieldRef; N] {
    fn into_fields(self) -> Vec<FieldRef> {
        self.into_iter().collect()
    }
}

/// `(alias, expression)` pairs
impl IntoFields for Vec<(&str, &str)> {
    fn into_fields(self) -> Vec<FieldRef> {
        self.into_iter()
            .map(|(alias, expr)| FieldRef::parse(expr).as_alias(alias))
            .collect()
    }
}

/// A table reference in FROM, JOIN, INSERT, UPDATE and DELETE
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    /// A bare table name, quoted on render
    Named(String),
    /// A nested SELECT, wrapped in parentheses on render
    Subquery(String),
    /// A computed expression, emitted verbatim
    Expression(String),
    /// A table with an `AS` alias
    Aliased { table: Box<TableRef>, alias: String },
    /// Several tables separated by commas
    List(Vec<TableRef>),
}

impl TableRef {
    /// Classify a table string
    pub fn parse(table: &str) -> Self {
        let table = table.trim();
        if table.to_lowercase().contains("select") {
            return TableRef::Subquery(table.to_string());
        }
        if TABLE_EXPRESSION_MARKERS.iter().any(|m| table.contains(m)) {
            return TableRef::Expression(table.to_string());
        }
        let items = split_aliases(table);
        if items.len() > 1 {
            return TableRef::List(items.iter().map(|t| TableRef::parse(t)).collect());
        }
        match split_alias(table) {
            Some((name, alias)) => TableRef::Named(name.to_string()).as_alias(alias),
            None => TableRef::Named(table.to_string()),
        }
    }

    /// A nested SELECT statement used as a table
    pub fn subquery(sql: impl Into<String>) -> Self {
        TableRef::Subquery(sql.into())
    }

    pub fn as_alias(self, alias: &str) -> Self {
        let table = match self {
            TableRef::Aliased { table, .. } => table,
            other => Box::new(other),
        };
        TableRef::Aliased {
            table,
            alias: unquote_alias(alias).to_string(),
        }
    }

    /// Whether the reference is a computed expression rather than a relation
    pub fn is_expression(&self) -> bool {
        matches!(self, TableRef::Expression(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TableRef::Named(s) | TableRef::Subquery(s) | TableRef::Expression(s) => {
                s.trim().is_empty()
            }
            TableRef::Aliased { table, .. } => table.is_empty(),
            TableRef::List(tables) => tables.is_empty() || tables.iter().any(TableRef::is_empty),
        }
    }

    /// Render as SQL
    pub fn render(&self) -> Result<String> {
        if self.is_empty() {
            return Err(Error::empty_input("table", "QueryBuilder::prepare_table"));
        }
        let sql = match self {
            TableRef::Named(name) => quote_qualified(name),
            TableRef::Subquery(sql) => {
                let sql = sql.trim();
                if sql.starts_with('(') && sql.ends_with(')') {
                    sql.to_string()
                } else {
                    format!("({sql})")
                }
            }
            TableRef::Expression(expr) => expr.trim().to_string(),
            TableRef::Aliased { table, alias } => {
                format!("{} AS {}", table.render()?, quote_identifier(alias))
            }
            TableRef::List(tables) => tables
                .iter()
                .map(TableRef::render)
                .collect::<Result<Vec<_>>>()?
                .join(", "),
        };
        Ok(sql)
    }
}

/// Create an explicit table reference
pub fn table(name: &str) -> TableRef {
    TableRef::Named(name.trim().to_string())
}

/// Trait for types that can be converted to a table reference
pub trait IntoTable {
    fn into_table(self) -> TableRef;
}

impl IntoTable for TableRef {
    fn into_table(self) -> TableRef {
        self
    }
}

impl IntoTable for &str {
    fn into_table(self) -> TableRef {
        TableRef::parse(self)
    }
}

impl IntoTable for String {
    fn into_table(self) -> TableRef {
        TableRef::parse(&self)
    }
}

impl IntoTable for &String {
    fn into_table(self) -> TableRef {
        TableRef::parse(self)
    }
}

/// `(alias, table)`
impl IntoTable for (&str, &str) {
    fn into_table(self) -> TableRef {
        TableRef::parse(self.1).as_alias(self.0)
    }
}
