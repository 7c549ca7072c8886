//! Statement composition model
//!
//! A statement is a list of sections. The first section is the head; every
//! later section is introduced by a set operator. Clauses are always appended
//! to the last section, so `ORDER BY` after a `UNION` lands at the very end.

use super::prepare::quote_identifier;
use crate::Value;
use std::fmt;

/// What kind of statement the head section is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Empty,
    Select,
    Insert,
    Update,
    Delete,
    DropView,
    DropTable,
    Truncate,
    Raw,
}

/// Operators that join two SELECT sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl SetOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Except => "EXCEPT",
            SetOperator::Intersect => "INTERSECT",
        }
    }
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Section {
    operator: Option<SetOperator>,
    sql: String,
}

#[derive(Debug, Clone, PartialEq)]
struct ViewHeader {
    name: String,
    if_not_exists: bool,
}

/// SQL text and parameters accumulated by a builder
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    kind: StatementKind,
    sections: Vec<Section>,
    pending: Option<SetOperator>,
    view: Option<ViewHeader>,
    params: Vec<Value>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a fresh head section
    pub fn start(&mut self, kind: StatementKind, sql: impl Into<String>) {
        *self = Self {
            kind,
            sections: vec![Section {
                operator: None,
                sql: sql.into(),
            }],
            ..Self::default()
        };
    }

    /// Open a new section with the pending set operator
    pub fn push_section(&mut self, sql: impl Into<String>) {
        let operator = self.pending.take();
        self.sections.push(Section {
            operator,
            sql: sql.into(),
        });
    }

    /// Append text to the current section
    pub fn append(&mut self, sql: &str) {
        match self.sections.last_mut() {
            Some(section) => section.sql.push_str(sql),
            None => self.push_section(sql),
        }
    }

    pub fn extend_params<I>(&mut self, params: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.params.extend(params);
    }

    /// Wait for the next SELECT to be joined with `operator`
    pub fn begin_compound(&mut self, operator: SetOperator) {
        self.pending = Some(operator);
    }

    pub fn pending(&self) -> Option<SetOperator> {
        self.pending
    }

    /// Whether `operator` already joins two sections or is waiting for one
    pub fn contains_set_operator(&self, operator: SetOperator) -> bool {
        self.pending == Some(operator)
            || self.sections.iter().any(|s| s.operator == Some(operator))
    }

    pub fn set_view(&mut self, name: &str, if_not_exists: bool) {
        self.view = Some(ViewHeader {
            name: name.trim().to_string(),
            if_not_exists,
        });
    }

    /// Whether the head section deletes rows, including caller-written SQL
    pub fn is_delete(&self) -> bool {
        match self.kind {
            StatementKind::Delete => true,
            StatementKind::Raw => self.sections.first().is_some_and(|head| {
                head.sql
                    .trim_start()
                    .get(..6)
                    .is_some_and(|word| word.eq_ignore_ascii_case("DELETE"))
            }),
            _ => false,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// More than one section, or a set operator waiting for its SELECT
    pub fn is_compound(&self) -> bool {
        self.sections.len() > 1 || self.pending.is_some()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Render the statement with `?` placeholders
    pub fn render(&self) -> String {
        let mut sql = String::new();
        if let Some(view) = &self.view {
            sql.push_str("CREATE VIEW ");
            if view.if_not_exists {
                sql.push_str("IF NOT EXISTS ");
            }
            sql.push_str(&quote_identifier(&view.name));
            sql.push_str(" AS ");
        }
        for section in &self.sections {
            if let Some(operator) = section.operator {
                sql.push_str(&format!(" {operator} "));
            }
            sql.push_str(&section.sql);
        }
        if let Some(operator) = self.pending {
            sql.push_str(&format!(" {operator}"));
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_section() {
        let mut statement = Statement::new();
        statement.start(StatementKind::Select, "SELECT * FROM `users`");
        statement.append(" WHERE (`id` = ?)");
        statement.extend_params([Value::I32(1)]);
        assert_eq!(statement.render(), "SELECT * FROM `users` WHERE (`id` = ?)");
        assert_eq!(statement.params(), &[Value::I32(1)]);
        assert!(!statement.is_compound());
    }

    #[test]
    fn test_compound_sections() {
        let mut statement = Statement::new();
        statement.start(StatementKind::Select, "SELECT `id` FROM `a`");
        statement.begin_compound(SetOperator::UnionAll);
        assert!(statement.is_compound());
        assert!(statement.contains_set_operator(SetOperator::UnionAll));
        statement.push_section("SELECT `id` FROM `b`");
        statement.append(" ORDER BY `id` ASC");
        assert_eq!(
            statement.render(),
            "SELECT `id` FROM `a` UNION ALL SELECT `id` FROM `b` ORDER BY `id` ASC"
        );
        assert!(statement.pending().is_none());
        assert!(!statement.contains_set_operator(SetOperator::Except));
    }

    #[test]
    fn test_view_header() {
        let mut statement = Statement::new();
        statement.start(StatementKind::Select, "SELECT * FROM `users`");
        statement.set_view("users_view", true);
        assert_eq!(
            statement.render(),
            "CREATE VIEW IF NOT EXISTS `users_view` AS SELECT * FROM `users`"
        );
    }

    #[test]
    fn test_start_clears_previous_state() {
        let mut statement = Statement::new();
        statement.start(StatementKind::Select, "SELECT 1");
        statement.extend_params([Value::I32(1)]);
        statement.begin_compound(SetOperator::Except);
        statement.start(StatementKind::Delete, "DELETE FROM `users`");
        assert_eq!(statement.render(), "DELETE FROM `users`");
        assert!(statement.params().is_empty());
        assert_eq!(statement.kind(), StatementKind::Delete);
        assert!(statement.is_delete());
    }

    #[test]
    fn test_raw_delete_is_detected() {
        let mut statement = Statement::new();
        statement.start(StatementKind::Raw, "  delete FROM users WHERE id = ?");
        assert!(statement.is_delete());
        statement.start(StatementKind::Raw, "SELECT * FROM deleted_users");
        assert!(!statement.is_delete());
        statement.start(StatementKind::Raw, "DEL");
        assert!(!statement.is_delete());
    }
}
