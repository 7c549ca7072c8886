//! Common types and traits shared across all statement verbs

use crate::{Result, Value};
use std::fmt;

/// A finished statement ready for the execution port
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with `?` placeholders and exactly one trailing semicolon
    pub sql: String,
    /// Positional parameters, one per placeholder, in source order
    pub params: Vec<Value>,
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::LeftOuter => "LEFT OUTER",
            JoinType::RightOuter => "RIGHT OUTER",
            JoinType::FullOuter => "FULL OUTER",
            JoinType::Cross => "CROSS",
        }
    }

    /// Parse a join keyword case-insensitively. `RIGHT` and `FULL` are read as
    /// their `OUTER` forms.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "INNER" => Some(JoinType::Inner),
            "LEFT" => Some(JoinType::Left),
            "LEFT OUTER" => Some(JoinType::LeftOuter),
            "RIGHT" | "RIGHT OUTER" => Some(JoinType::RightOuter),
            "FULL" | "FULL OUTER" => Some(JoinType::FullOuter),
            "CROSS" => Some(JoinType::Cross),
            _ => None,
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested join type before dialect validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTypeSpec {
    Known(JoinType),
    Unknown(String),
}

/// Trait for values accepted as a join type
pub trait IntoJoinType {
    fn into_join_type(self) -> JoinTypeSpec;
}

impl IntoJoinType for JoinType {
    fn into_join_type(self) -> JoinTypeSpec {
        JoinTypeSpec::Known(self)
    }
}

impl IntoJoinType for &str {
    fn into_join_type(self) -> JoinTypeSpec {
        match JoinType::parse(self) {
            Some(join_type) => JoinTypeSpec::Known(join_type),
            None => JoinTypeSpec::Unknown(self.trim().to_uppercase()),
        }
    }
}

/// The ON part of a JOIN clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOn {
    /// No ON clause, as for CROSS JOIN
    None,
    /// `left = right`, both sides quoted as columns
    Columns(String, String),
    /// A caller-written ON expression, emitted verbatim
    Raw(String),
}

/// Trait for values accepted as a join condition
pub trait IntoJoinOn {
    fn into_join_on(self) -> JoinOn;
}

impl IntoJoinOn for JoinOn {
    fn into_join_on(self) -> JoinOn {
        self
    }
}

impl IntoJoinOn for () {
    fn into_join_on(self) -> JoinOn {
        JoinOn::None
    }
}

impl IntoJoinOn for &str {
    fn into_join_on(self) -> JoinOn {
        if self.trim().is_empty() {
            JoinOn::None
        } else {
            JoinOn::Raw(self.to_string())
        }
    }
}

impl IntoJoinOn for String {
    fn into_join_on(self) -> JoinOn {
        self.as_str().into_join_on()
    }
}

impl IntoJoinOn for (&str, &str) {
    fn into_join_on(self) -> JoinOn {
        JoinOn::Columns(self.0.to_string(), self.1.to_string())
    }
}

impl IntoJoinOn for [&str; 2] {
    fn into_join_on(self) -> JoinOn {
        JoinOn::Columns(self[0].to_string(), self[1].to_string())
    }
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Unrecognised or empty tokens fall back to ascending order
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// A single ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }

    /// Read `"field"` or `"field dir"`
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match spec.split_once(' ') {
            Some((field, direction)) => Self::new(field, SortDirection::parse(direction)),
            None => Self::new(spec, SortDirection::Asc),
        }
    }
}

/// Trait to convert various types into ORDER BY entries
pub trait IntoSortSpecs {
    fn into_sort_specs(self) -> Vec<SortSpec>;
}

impl IntoSortSpecs for &str {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        vec![SortSpec::parse(self)]
    }
}

impl IntoSortSpecs for String {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        vec![SortSpec::parse(&self)]
    }
}

impl IntoSortSpecs for (&str, SortDirection) {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        vec![SortSpec::new(self.0, self.1)]
    }
}

impl IntoSortSpecs for (&str, &str) {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        vec![SortSpec::new(self.0, SortDirection::parse(self.1))]
    }
}

impl IntoSortSpecs for SortSpec {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        vec![self]
    }
}

impl IntoSortSpecs for Vec<SortSpec> {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        self
    }
}

impl IntoSortSpecs for Vec<&str> {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        self.into_iter().map(SortSpec::parse).collect()
    }
}

impl<const N: usize> IntoSortSpecs for [&str; N] {
    fn into_sort_specs(self) -> Vec<SortSpec> {
        self.into_iter().map(SortSpec::parse).collect()
    }
}

/// Column names plus one or more rows of values for an INSERT
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertData {
    /// Start a multi-row insert with the given column names
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row of values
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Trait for types that can be converted to INSERT data
pub trait IntoInsertData {
    fn into_insert_data(self) -> InsertData;
}

impl IntoInsertData for InsertData {
    fn into_insert_data(self) -> InsertData {
        self
    }
}

impl<K, V> IntoInsertData for Vec<(K, V)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> InsertData {
        let (columns, values): (Vec<String>, Vec<Value>) = self
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .unzip();
        let rows = if values.is_empty() { Vec::new() } else { vec![values] };
        InsertData { columns, rows }
    }
}

impl<K, V, const N: usize> IntoInsertData for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> InsertData {
        Vec::from(self).into_insert_data()
    }
}

impl<V> IntoInsertData for std::collections::BTreeMap<String, V>
where
    V: Into<Value>,
{
    fn into_insert_data(self) -> InsertData {
        self.into_iter().collect::<Vec<_>>().into_insert_data()
    }
}

/// Trait for types that can be converted to UPDATE assignments
pub trait IntoUpdateData {
    fn into_update_data(self) -> Vec<(String, Value)>;
}

impl<K, V> IntoUpdateData for Vec<(K, V)>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_update_data(self) -> Vec<(String, Value)> {
        self.into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .collect()
    }
}

impl<K, V, const N: usize> IntoUpdateData for [(K, V); N]
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_update_data(self) -> Vec<(String, Value)> {
        Vec::from(self).into_update_data()
    }
}

impl<V> IntoUpdateData for std::collections::BTreeMap<String, V>
where
    V: Into<Value>,
{
    fn into_update_data(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k, v.into())).collect()
    }
}

/// Terminate a statement with exactly one semicolon
///
/// ```
/// use quarry_core::add_semicolon;
///
/// assert_eq!(add_semicolon("SELECT 1"), "SELECT 1;");
/// assert_eq!(add_semicolon("SELECT 1;"), "SELECT 1;");
/// ```
pub fn add_semicolon(sql: &str) -> String {
    let trimmed = sql.trim_end();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

/// Render `count` comma-separated placeholders, e.g. `?,?,?`
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Count `?` placeholders outside quoted strings and identifiers
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut count = 0;
    for ch in sql.chars() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '?') => count += 1,
            (None, _) => {}
        }
    }
    count
}

/// Fallible conversions used by verbs that validate their input up front
pub(crate) fn non_empty<'s>(
    value: &'s str,
    argument: &'static str,
    context: &'static str,
) -> Result<&'s str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(crate::Error::empty_input(argument, context))
    } else {
        Ok(trimmed)
    }
}
