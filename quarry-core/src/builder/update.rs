//! UPDATE verb

use super::common::IntoUpdateData;
use super::prepare::{FieldRef, IntoTable};
use super::statement::StatementKind;
use super::QueryBuilder;
use crate::executor::ConnectionPool;
use crate::{Error, Result};

const CONTEXT: &str = "QueryBuilder::update";

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Start an UPDATE. Assignments keep the caller's order. No WHERE is
    /// added; chain [`where_`](Self::where_) to scope it.
    pub fn update(&mut self, table: impl IntoTable, data: impl IntoUpdateData) -> &mut Self {
        let table = table.into_table();
        let assignments = data.into_update_data();
        self.start(StatementKind::Update, |_| {
            if table.is_empty() || assignments.is_empty() {
                return Err(Error::empty_input("table or fields", CONTEXT));
            }
            let sets = assignments
                .iter()
                .map(|(column, _)| Ok(format!("{} = ?", FieldRef::parse(column).render()?)))
                .collect::<Result<Vec<_>>>()?;
            let sql = format!("UPDATE {} SET {}", table.render()?, sets.join(", "));
            let params = assignments.into_iter().map(|(_, value)| value).collect();
            Ok((sql, params))
        })
    }
}
