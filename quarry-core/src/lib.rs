//! Quarry Core - a fluent SQL statement compiler
//!
//! A [`QueryBuilder`] turns chained verbs into one parameterized statement
//! with backtick-quoted identifiers and positional `?` placeholders, checks
//! it against the SQLite or MySQL dialect, and runs it through a
//! [`ConnectionPool`].
//!
//! ```
//! use quarry_core::{add_semicolon, col, Conditions};
//!
//! let conditions = Conditions::new()
//!     .push(("u.id", "=", col("p.user_id")))
//!     .and(("p.status", "published"));
//! let fragment = conditions.compile().unwrap();
//! assert_eq!(fragment.sql, "(`u`.`id` = `p`.`user_id`) AND (`p`.`status` = ?)");
//! assert_eq!(add_semicolon("SELECT 1"), "SELECT 1;");
//! ```

pub mod builder;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod operator;
pub mod value;

// Re-export main types
pub use builder::{
    add_semicolon, col, table, CompiledQuery, Condition, Conditions, FieldRef, Fragment,
    InsertData, JoinOn, JoinType, Operand, QueryBuilder, SetOperator, SortDirection, SortSpec,
    TableRef,
};
pub use config::{BuilderOptions, ConnectionConfig, Driver};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use executor::{ConnectionPool, ExecOutcome, Row};
pub use operator::{op, IntoOperator, Logic, Operator};
pub use value::Value;
