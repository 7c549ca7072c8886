//! DELETE verb

use super::prepare::IntoTable;
use super::statement::StatementKind;
use super::QueryBuilder;
use crate::executor::ConnectionPool;
use crate::Error;

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Start a DELETE. Chain [`where_`](Self::where_) to scope it.
    pub fn delete(&mut self, table: impl IntoTable) -> &mut Self {
        let table = table.into_table();
        self.start(StatementKind::Delete, |_| {
            if table.is_empty() {
                return Err(Error::empty_input("table", "QueryBuilder::delete"));
            }
            Ok((format!("DELETE FROM {}", table.render()?), Vec::new()))
        })
    }
}
