//! View and table DDL verbs

use super::common::non_empty;
use super::prepare::quote_qualified;
use super::statement::StatementKind;
use super::QueryBuilder;
use crate::executor::ConnectionPool;
use crate::Error;

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Wrap the current SELECT as `CREATE VIEW [IF NOT EXISTS] name AS ...`
    pub fn create_view(&mut self, name: &str, if_not_exists: bool) -> &mut Self {
        self.apply(|qb| {
            let name = non_empty(name, "view_name", "QueryBuilder::create_view")?;
            if qb.statement.kind() != StatementKind::Select || qb.statement.pending().is_some() {
                return Err(Error::missing_select("QueryBuilder::create_view"));
            }
            qb.statement.set_view(name, if_not_exists);
            Ok(())
        })
    }

    /// `DROP VIEW [IF EXISTS] name`
    pub fn drop_view(&mut self, name: &str, if_exists: bool) -> &mut Self {
        self.start(StatementKind::DropView, |_| {
            let name = non_empty(name, "view_name", "QueryBuilder::drop_view")?;
            Ok((
                format!("DROP VIEW {}{}", if_exists_clause(if_exists), quote_qualified(name)),
                Vec::new(),
            ))
        })
    }

    /// `DROP TABLE [IF EXISTS] table`
    pub fn drop(&mut self, table: &str, if_exists: bool) -> &mut Self {
        self.start(StatementKind::DropTable, |_| {
            let table = non_empty(table, "table", "QueryBuilder::drop")?;
            Ok((
                format!("DROP TABLE {}{}", if_exists_clause(if_exists), quote_qualified(table)),
                Vec::new(),
            ))
        })
    }

    /// `TRUNCATE TABLE table`
    pub fn truncate(&mut self, table: &str) -> &mut Self {
        self.start(StatementKind::Truncate, |_| {
            let table = non_empty(table, "table", "QueryBuilder::truncate")?;
            Ok((format!("TRUNCATE TABLE {}", quote_qualified(table)), Vec::new()))
        })
    }
}

fn if_exists_clause(if_exists: bool) -> &'static str {
    if if_exists {
        "IF EXISTS "
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::condition::Conditions;
    use crate::builder::tests::MockPool;
    use crate::Value;

    #[test]
    fn test_create_view_from_select() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "*")
            .where_(Conditions::new().push(("email", "is null")).or(("email", "")))
            .create_view("users_no_email", true);
        assert!(!qb.has_error());
        assert_eq!(
            qb.to_sql(true),
            "CREATE VIEW IF NOT EXISTS `users_no_email` AS SELECT * FROM `users` WHERE (`email` IS NULL) OR (`email` = '')"
        );
        assert_eq!(qb.parameters(), &[Value::from("")]);
    }

    #[test]
    fn test_create_view_without_if_not_exists() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "*")
            .is_null("email")
            .create_view("users_no_email", false);
        assert_eq!(
            qb.to_sql(false),
            "CREATE VIEW `users_no_email` AS SELECT * FROM `users` WHERE (`email` IS NULL)"
        );
    }

    #[test]
    fn test_create_view_requires_select() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.delete("comments")
            .where_(("user_id", 10))
            .create_view("user_comments", true);
        assert!(qb.has_error());
        assert_eq!(qb.error_message(), "No SELECT found in QueryBuilder::create_view");

        let mut qb = QueryBuilder::new(&pool);
        qb.create_view("", true);
        assert_eq!(qb.error_message(), "Empty view_name in QueryBuilder::create_view");
    }

    #[test]
    fn test_drop_view() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.drop_view("users_no_email", true);
        assert_eq!(qb.to_sql(false), "DROP VIEW IF EXISTS `users_no_email`");
        qb.drop_view("users_no_email", false);
        assert_eq!(qb.to_sql(false), "DROP VIEW `users_no_email`");
        assert!(qb.parameters().is_empty());
        qb.drop_view("", true);
        assert_eq!(qb.error_message(), "Empty view_name in QueryBuilder::drop_view");
    }

    #[test]
    fn test_drop_table() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.drop("temporary", true);
        assert_eq!(qb.to_sql(false), "DROP TABLE IF EXISTS `temporary`");
        qb.drop("temporary", false);
        assert_eq!(qb.to_sql(false), "DROP TABLE `temporary`");
        qb.drop("", true);
        assert_eq!(qb.error_message(), "Empty table in QueryBuilder::drop");
    }

    #[test]
    fn test_truncate() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "*").where_(("id", 1));
        qb.truncate("users");
        assert_eq!(qb.to_sql(false), "TRUNCATE TABLE `users`");
        assert!(qb.parameters().is_empty());
        qb.truncate(" ");
        assert_eq!(qb.error_message(), "Empty table in QueryBuilder::truncate");
    }
}
