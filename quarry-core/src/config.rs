//! Connection and builder configuration

use crate::dialect::Dialect;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Database driver a connection is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// SQLite database file named by `dbname`
    Sqlite,
    /// Private in-memory SQLite database
    Memory,
    Mysql,
}

impl Driver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::Memory => "memory",
            Driver::Mysql => "mysql",
        }
    }
}

/// Connection settings, usually read from a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub driver: Driver,
    #[serde(default)]
    pub dbname: String,
    #[serde(default, alias = "dbhost")]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub charset: Option<String>,
}

impl ConnectionConfig {
    /// SQLite database at `path`, created if missing
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Driver::Sqlite, path)
    }

    pub fn memory() -> Self {
        Self::new(Driver::Memory, "")
    }

    pub fn mysql(
        host: impl Into<String>,
        dbname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: Some(host.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::new(Driver::Mysql, dbname)
        }
    }

    fn new(driver: Driver, dbname: impl Into<String>) -> Self {
        Self {
            driver,
            dbname: dbname.into(),
            host: None,
            port: None,
            username: None,
            password: None,
            charset: None,
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Parse a JSON document such as
    /// `{"driver": "mysql", "dbhost": "localhost", "dbname": "app", ...}`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))
    }

    /// The sqlx connection URL for these settings
    pub fn database_url(&self) -> Result<String> {
        match self.driver {
            Driver::Memory => Ok("sqlite::memory:".to_string()),
            Driver::Sqlite => {
                let path = self.dbname.trim();
                if path.is_empty() {
                    return Err(Error::config("sqlite driver needs a dbname"));
                }
                Ok(format!("sqlite://{path}?mode=rwc"))
            }
            Driver::Mysql => {
                let dbname = self.dbname.trim();
                if dbname.is_empty() {
                    return Err(Error::config("mysql driver needs a dbname"));
                }
                let host = self.host.as_deref().unwrap_or("localhost");
                let mut url = String::from("mysql://");
                if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
                    url.push_str(username);
                    if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
                        url.push(':');
                        url.push_str(password);
                    }
                    url.push('@');
                }
                url.push_str(host);
                if let Some(port) = self.port {
                    url.push_str(&format!(":{port}"));
                }
                url.push('/');
                url.push_str(dbname);
                if let Some(charset) = self.charset.as_deref().filter(|c| !c.is_empty()) {
                    url.push_str(&format!("?charset={charset}"));
                }
                Ok(url)
            }
        }
    }

    /// Dialect statements built against this connection will use
    pub fn dialect(&self) -> Dialect {
        Dialect::from_driver_name(self.driver.as_str())
    }

    /// Open a SQLite pool for `sqlite` or `memory` settings
    #[cfg(feature = "sqlite")]
    pub async fn connect_sqlite(&self) -> Result<crate::executor::sqlite::SqlitePool> {
        use crate::executor::sqlite::SqlitePool;
        match self.driver {
            Driver::Memory => SqlitePool::in_memory().await,
            Driver::Sqlite => SqlitePool::connect(&self.database_url()?).await,
            Driver::Mysql => Err(Error::config("mysql settings cannot open a sqlite pool")),
        }
    }

    /// Open a MySQL pool
    #[cfg(feature = "mysql")]
    pub async fn connect_mysql(&self) -> Result<crate::executor::mysql::MySqlPool> {
        if self.driver != Driver::Mysql {
            return Err(Error::config(format!(
                "{} settings cannot open a mysql pool",
                self.driver.as_str()
            )));
        }
        crate::executor::mysql::MySqlPool::connect(&self.database_url()?).await
    }
}

/// Per-builder switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Log recorded errors at `warn` level instead of `debug`
    #[serde(default)]
    pub log_errors: bool,
}
