//! Dialect policy
//!
//! The driver name reported by the execution port picks a dialect, and the
//! dialect decides which join types are legal and whether `LIMIT` may follow
//! a `DELETE`.

use crate::builder::common::JoinType;
use crate::{Error, Result};
use std::fmt;

/// Database engine family the statement is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
    Generic,
}

const SQLITE_JOIN_TYPES: &[JoinType] = &[
    JoinType::Inner,
    JoinType::Left,
    JoinType::LeftOuter,
    JoinType::Cross,
];

const JOIN_TYPES: &[JoinType] = &[
    JoinType::Inner,
    JoinType::Left,
    JoinType::LeftOuter,
    JoinType::RightOuter,
    JoinType::FullOuter,
    JoinType::Cross,
];

impl Dialect {
    /// Pick the dialect for a driver name such as `sqlite` or `mysql`
    pub fn from_driver_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" | "memory" => Dialect::Sqlite,
            "mysql" | "mariadb" => Dialect::MySql,
            _ => Dialect::Generic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "SQLite",
            Dialect::MySql => "MySQL",
            Dialect::Generic => "this dialect",
        }
    }

    /// Join types this dialect accepts
    pub fn join_types(&self) -> &'static [JoinType] {
        match self {
            Dialect::Sqlite => SQLITE_JOIN_TYPES,
            Dialect::MySql | Dialect::Generic => JOIN_TYPES,
        }
    }

    pub fn allows_join(&self, join_type: JoinType) -> bool {
        self.join_types().contains(&join_type)
    }

    /// Check a join type, producing the dialect-specific error when illegal
    pub fn check_join(&self, join_type: JoinType) -> Result<()> {
        if self.allows_join(join_type) {
            Ok(())
        } else {
            Err(self.illegal_join(join_type.as_str()))
        }
    }

    pub(crate) fn illegal_join(&self, join_type: &str) -> Error {
        Error::IllegalJoinType {
            join_type: join_type.to_string(),
            dialect: self.name().to_string(),
        }
    }

    /// SQLite builds without `SQLITE_ENABLE_UPDATE_DELETE_LIMIT` reject `DELETE … LIMIT`
    pub fn allows_delete_limit(&self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
