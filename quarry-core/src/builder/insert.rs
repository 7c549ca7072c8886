//! INSERT verb

use super::common::{placeholders, IntoInsertData};
use super::prepare::{prepare_field_list, FieldRef, IntoTable};
use super::statement::StatementKind;
use super::QueryBuilder;
use crate::executor::ConnectionPool;
use crate::Error;

const CONTEXT: &str = "QueryBuilder::insert";

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Start an INSERT.
    ///
    /// `data` is either `(column, value)` pairs for a single row or an
    /// [`InsertData`](super::InsertData) with several rows, which become one
    /// multi-row `VALUES` list with parameters flattened row by row.
    pub fn insert(&mut self, table: impl IntoTable, data: impl IntoInsertData) -> &mut Self {
        let table = table.into_table();
        let data = data.into_insert_data();
        self.start(StatementKind::Insert, |_| {
            if table.is_empty() || data.columns.is_empty() || data.rows.is_empty() {
                return Err(Error::empty_input("table or fields", CONTEXT));
            }
            if data.rows.iter().any(|row| row.len() != data.columns.len()) {
                return Err(Error::invalid_type(
                    "fields",
                    CONTEXT,
                    "rows with one value per column",
                ));
            }
            let columns: Vec<FieldRef> = data.columns.iter().map(|c| FieldRef::parse(c)).collect();
            let row = format!("({})", placeholders(data.columns.len()));
            let values = vec![row; data.rows.len()].join(",");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                table.render()?,
                prepare_field_list(&columns)?,
                values
            );
            let params = data.rows.iter().flatten().cloned().collect();
            Ok((sql, params))
        })
    }
}
