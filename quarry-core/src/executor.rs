//! Execution port and terminal verbs
//!
//! The builder never talks to a database directly. It hands the compiled
//! statement and its positional parameters to a [`ConnectionPool`], which
//! prepares, binds and runs it in one call.

use crate::builder::{CompiledQuery, FieldRef, QueryBuilder};
use crate::{Error, Result, Value};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::debug;

/// One fetched row, keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// What a statement without a result set reports back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Trait for database connection pools
pub trait ConnectionPool: Send + Sync {
    /// Driver identity, used to pick the dialect (`sqlite`, `mysql`, ...)
    fn driver_name(&self) -> &str;

    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE, DDL)
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<ExecOutcome>> + Send;

    /// Execute a statement and collect every row
    fn fetch_all(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Execute a statement and return the first row, if any
    fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Option<Row>>> + Send;
}

impl<'a, P: ConnectionPool> QueryBuilder<'a, P> {
    /// Compile the statement for a terminal verb. A builder error stops
    /// execution; an execution error from an earlier attempt is dropped so
    /// the statement can be retried.
    fn prepare_execution(&mut self) -> Result<CompiledQuery> {
        if self.error.as_ref().is_some_and(Error::is_execution) {
            self.error = None;
        }
        match self.compile() {
            Ok(query) => {
                debug!(sql = %query.sql, params = query.params.len(), "executing statement");
                Ok(query)
            }
            Err(err) => {
                if self.error.is_none() {
                    self.record_error(err.clone());
                }
                Err(err)
            }
        }
    }

    fn execution_failed(&mut self, err: Error) -> Error {
        self.result.clear();
        self.row_count = None;
        self.record_error(err.clone());
        err
    }

    fn store_rows(&mut self, rows: Vec<Row>) {
        self.row_count = Some(rows.len());
        self.result = rows;
    }

    /// Fetch every row of the statement
    pub async fn all(&mut self) -> Result<Vec<Row>> {
        let query = self.prepare_execution()?;
        match self.pool.fetch_all(&query.sql, &query.params).await {
            Ok(rows) => {
                self.store_rows(rows);
                Ok(self.result.clone())
            }
            Err(err) => Err(self.execution_failed(err)),
        }
    }

    /// Fetch every row and deserialize each into `T`
    pub async fn all_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        let rows = self.all().await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)).map_err(Error::from))
            .collect()
    }

    /// Fetch a single row
    pub async fn one(&mut self) -> Result<Option<Row>> {
        let query = self.prepare_execution()?;
        match self.pool.fetch_optional(&query.sql, &query.params).await {
            Ok(row) => {
                self.store_rows(row.iter().cloned().collect());
                Ok(row)
            }
            Err(err) => Err(self.execution_failed(err)),
        }
    }

    /// Fetch a single row and deserialize it into `T`
    pub async fn one_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.one().await? {
            Some(row) => Ok(Some(serde_json::from_value(serde_json::Value::Object(row))?)),
            None => Ok(None),
        }
    }

    /// Execute without fetching. Returns the driver's last insert id, which
    /// is only meaningful after an INSERT; 0 when the driver reports none.
    pub async fn go(&mut self) -> Result<i64> {
        let query = self.prepare_execution()?;
        match self.pool.execute(&query.sql, &query.params).await {
            Ok(outcome) => {
                self.result.clear();
                self.row_count = Some(usize::try_from(outcome.rows_affected).unwrap_or(usize::MAX));
                Ok(outcome.last_insert_id.unwrap_or(0))
            }
            Err(err) => Err(self.execution_failed(err)),
        }
    }

    /// Fetch every row and project one column. Rows without it are skipped.
    pub async fn column(&mut self, name: &str) -> Result<Vec<serde_json::Value>> {
        let name = name.trim();
        if name.is_empty() {
            let err = Error::empty_input("column", "QueryBuilder::column");
            self.record_error(err.clone());
            return Err(err);
        }
        let rows = self.all().await?;
        Ok(rows.into_iter().filter_map(|mut row| row.remove(name)).collect())
    }

    /// Fetch every row and map the `key` column to the `column` column
    pub async fn pluck(&mut self, key: &str, column: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
        if key.trim().is_empty() || column.trim().is_empty() {
            let err = Error::empty_input("key or column", "QueryBuilder::pluck");
            self.record_error(err.clone());
            return Err(err);
        }
        let rows = self.all().await?;
        let mut out = serde_json::Map::new();
        for mut row in rows {
            let (Some(k), Some(v)) = (row.remove(key.trim()), row.remove(column.trim())) else {
                continue;
            };
            let k = match k {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            out.insert(k, v);
        }
        Ok(out)
    }

    /// Whether the statement yields at least one row
    pub async fn exists(&mut self) -> Result<bool> {
        self.one().await?;
        Ok(self.row_count.is_some_and(|n| n > 0))
    }

    /// `SELECT COUNT(field) AS counter FROM table`; an empty field counts rows
    pub async fn count(&mut self, table: &str, field: &str) -> Result<i64> {
        let target = if field.trim().is_empty() {
            "*".to_string()
        } else {
            match FieldRef::parse(field).render() {
                Ok(rendered) => rendered,
                Err(err) => {
                    self.record_error(err.clone());
                    return Err(err);
                }
            }
        };
        self.select(table, format!("COUNT({target}) AS counter"));
        let values = self.column("counter").await?;
        Ok(values.first().and_then(counter_value).unwrap_or(0))
    }
}

fn counter_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// SQLite connection pool wrapper
#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::*;
    use futures::TryStreamExt;
    use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
    use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};

    /// SQLite connection pool wrapper
    #[derive(Clone)]
    pub struct SqlitePool {
        inner: sqlx::SqlitePool,
    }

    impl SqlitePool {
        /// Open a pool for a `sqlite://` connection string
        pub async fn connect(database_url: &str) -> Result<Self> {
            let pool = sqlx::SqlitePool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        /// Open a private in-memory database. One connection, so every
        /// statement sees the same database.
        pub async fn in_memory() -> Result<Self> {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;
            Ok(Self { inner: pool })
        }

        /// Create from an existing sqlx pool
        pub fn from_pool(pool: sqlx::SqlitePool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for SqlitePool {
        fn driver_name(&self) -> &str {
            "sqlite"
        }

        async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
            let result = bind_values(sqlx::query(sql), params)
                .execute(&self.inner)
                .await?;
            Ok(ExecOutcome {
                rows_affected: result.rows_affected(),
                last_insert_id: Some(result.last_insert_rowid()),
            })
        }

        async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
            let mut stream = bind_values(sqlx::query(sql), params).fetch(&self.inner);
            let mut rows = Vec::new();
            while let Some(row) = stream.try_next().await? {
                rows.push(row_to_map(&row)?);
            }
            Ok(rows)
        }

        async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
            let row = bind_values(sqlx::query(sql), params)
                .fetch_optional(&self.inner)
                .await?;
            row.as_ref().map(row_to_map).transpose()
        }
    }

    fn bind_values<'q>(
        mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(f64::from(*f)),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::Json(j) => query.bind(j.to_string()),
            };
        }
        query
    }

    fn row_to_map(row: &SqliteRow) -> Result<Row> {
        let mut map = Row::new();
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let type_name = raw.type_info().name().to_string();
                match type_name.as_str() {
                    "INTEGER" | "BOOLEAN" => Value::I64(row.try_get(index)?),
                    "REAL" => Value::F64(row.try_get(index)?),
                    "BLOB" => Value::Bytes(row.try_get(index)?),
                    _ => Value::String(row.try_get_unchecked(index)?),
                }
            };
            map.insert(column.name().to_string(), value.to_json());
        }
        Ok(map)
    }
}

/// MySQL connection pool wrapper
#[cfg(feature = "mysql")]
pub mod mysql {
    use super::*;
    use futures::TryStreamExt;
    use sqlx::mysql::{MySqlArguments, MySqlRow};
    use sqlx::{Column, MySql, Row as _, TypeInfo, ValueRef};

    /// MySQL connection pool wrapper
    #[derive(Clone)]
    pub struct MySqlPool {
        inner: sqlx::MySqlPool,
    }

    impl MySqlPool {
        /// Open a pool for a `mysql://` connection string
        pub async fn connect(database_url: &str) -> Result<Self> {
            let pool = sqlx::MySqlPool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        /// Create from an existing sqlx pool
        pub fn from_pool(pool: sqlx::MySqlPool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for MySqlPool {
        fn driver_name(&self) -> &str {
            "mysql"
        }

        async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
            let result = bind_values(sqlx::query(sql), params)
                .execute(&self.inner)
                .await?;
            Ok(ExecOutcome {
                rows_affected: result.rows_affected(),
                last_insert_id: i64::try_from(result.last_insert_id()).ok(),
            })
        }

        async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
            let mut stream = bind_values(sqlx::query(sql), params).fetch(&self.inner);
            let mut rows = Vec::new();
            while let Some(row) = stream.try_next().await? {
                rows.push(row_to_map(&row)?);
            }
            Ok(rows)
        }

        async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
            let row = bind_values(sqlx::query(sql), params)
                .fetch_optional(&self.inner)
                .await?;
            row.as_ref().map(row_to_map).transpose()
        }
    }

    fn bind_values<'q>(
        mut query: sqlx::query::Query<'q, MySql, MySqlArguments>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::Json(j) => query.bind(j.to_string()),
            };
        }
        query
    }

    fn row_to_map(row: &MySqlRow) -> Result<Row> {
        let mut map = Row::new();
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                map.insert(column.name().to_string(), Value::Null.to_json());
                continue;
            }
            let type_name = column.type_info().name().to_string();
            let value = match type_name.as_str() {
                "BOOLEAN" => Value::Bool(row.try_get_unchecked(index)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                    Value::I64(row.try_get_unchecked(index)?)
                }
                // u64 has no Value variant; keep it exact as JSON
                name if name.ends_with("UNSIGNED") => {
                    let n: u64 = row.try_get_unchecked(index)?;
                    map.insert(column.name().to_string(), serde_json::Value::from(n));
                    continue;
                }
                "FLOAT" => Value::F32(row.try_get_unchecked(index)?),
                "DOUBLE" => Value::F64(row.try_get_unchecked(index)?),
                "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                    Value::Bytes(row.try_get_unchecked(index)?)
                }
                _ => Value::String(row.try_get_unchecked(index)?),
            };
            map.insert(column.name().to_string(), value.to_json());
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::MockPool;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: i64,
        name: String,
    }

    fn users_pool() -> MockPool {
        MockPool::sqlite().with_rows(json!([
            {"id": 1, "name": "John", "email": "john@example.com"},
            {"id": 2, "name": "Jane", "email": "jane@example.com"},
            {"id": 3, "name": "Bob"}
        ]))
    }

    #[tokio::test]
    async fn test_all_sends_terminated_statement() {
        let pool = users_pool();
        let mut qb = QueryBuilder::new(&pool);
        let rows = qb.select("users", "*").where_(("id", ">", 0)).all().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(qb.row_count(), Some(3));
        assert_eq!(qb.first().and_then(|r| r.get("name")), Some(&json!("John")));
        assert_eq!(qb.last().and_then(|r| r.get("name")), Some(&json!("Bob")));

        let executed = pool.executed.lock().unwrap();
        assert_eq!(executed[0].0, "SELECT * FROM `users` WHERE (`id` > ?);");
        assert_eq!(executed[0].1, vec![Value::I32(0)]);
    }

    #[tokio::test]
    async fn test_all_as_deserializes_rows() {
        let pool = users_pool();
        let mut qb = QueryBuilder::new(&pool);
        let users: Vec<User> = qb.select("users", "id, name").all_as().await.unwrap();
        assert_eq!(users[1], User { id: 2, name: "Jane".to_string() });
    }

    #[tokio::test]
    async fn test_one_and_exists() {
        let pool = users_pool();
        let mut qb = QueryBuilder::new(&pool);
        let row = qb.select("users", "*").where_(("id", 1)).one().await.unwrap();
        assert_eq!(row.and_then(|r| r.get("id").cloned()), Some(json!(1)));
        assert_eq!(qb.row_count(), Some(1));

        let user: Option<User> = qb.select("users", "*").one_as().await.unwrap();
        assert_eq!(user.map(|u| u.name), Some("John".to_string()));

        assert!(qb.select("users", "*").exists().await.unwrap());

        let empty = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&empty);
        assert!(!qb.select("users", "*").where_(("id", 99)).exists().await.unwrap());
        assert_eq!(qb.row_count(), Some(0));
    }

    #[tokio::test]
    async fn test_go_returns_last_insert_id() {
        let pool = MockPool::sqlite();
        let mut qb = QueryBuilder::new(&pool);
        assert_eq!(qb.row_count(), None);
        let id = qb
            .insert("groups", [("name", "Moderator"), ("permissions", "moderator")])
            .go()
            .await
            .unwrap();
        assert_eq!(id, 42);
        assert_eq!(qb.row_count(), Some(1));
        assert_eq!(
            pool.last_sql().as_deref(),
            Some("INSERT INTO `groups` (`name`, `permissions`) VALUES (?,?);")
        );
    }

    #[tokio::test]
    async fn test_column_and_pluck() {
        let pool = users_pool();
        let mut qb = QueryBuilder::new(&pool);
        let emails = qb.select("users", "*").column("email").await.unwrap();
        assert_eq!(emails, vec![json!("john@example.com"), json!("jane@example.com")]);

        let names = qb.select("users", "*").pluck("id", "name").await.unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.get("2"), Some(&json!("Jane")));

        assert!(qb.column("").await.is_err());
        assert_eq!(qb.error_message(), "Empty column in QueryBuilder::column");
    }

    #[tokio::test]
    async fn test_count() {
        let pool = MockPool::mysql().with_rows(json!([{"counter": 3}]));
        let mut qb = QueryBuilder::new(&pool);
        assert_eq!(qb.count("users", "").await.unwrap(), 3);
        assert_eq!(
            pool.last_sql().as_deref(),
            Some("SELECT COUNT(*) AS `counter` FROM `users`;")
        );

        assert_eq!(qb.count("users", "email").await.unwrap(), 3);
        assert_eq!(
            pool.last_sql().as_deref(),
            Some("SELECT COUNT(`email`) AS `counter` FROM `users`;")
        );
    }

    #[tokio::test]
    async fn test_builder_error_blocks_execution() {
        let pool = users_pool();
        let mut qb = QueryBuilder::new(&pool);
        qb.select("users", "*").join("clients", (), "full");
        let err = qb.all().await.unwrap_err();
        assert!(matches!(err, Error::IllegalJoinType { .. }));
        assert!(pool.executed.lock().unwrap().is_empty());

        let mut qb = QueryBuilder::new(&pool);
        assert!(matches!(qb.go().await, Err(Error::EmptyInput { argument: "sql", .. })));
        assert!(qb.has_error());
    }

    #[tokio::test]
    async fn test_execution_failure_is_sticky_and_retryable() {
        let pool = MockPool::sqlite().failing();
        let mut qb = QueryBuilder::new(&pool);
        qb.delete("users").where_(("id", 1));
        let err = qb.go().await.unwrap_err();
        assert!(err.is_execution());
        assert_eq!(qb.error_message(), "Error executing query: mock failure");
        assert_eq!(qb.row_count(), None);

        // the statement is kept and a retry reaches the pool again
        assert!(qb.go().await.is_err());
        assert_eq!(pool.executed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_terminal_verbs_with_block_on() {
        let pool = users_pool();
        let mut qb = QueryBuilder::new(&pool);
        let count = tokio_test::block_on(async { qb.select("users", "*").all().await.map(|r| r.len()) });
        assert_eq!(count.unwrap(), 3);
    }

    #[test]
    fn test_counter_value() {
        assert_eq!(counter_value(&json!(5)), Some(5));
        assert_eq!(counter_value(&json!("7")), Some(7));
        assert_eq!(counter_value(&json!(null)), None);
    }
}
