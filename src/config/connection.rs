//! Database connection configuration.
//!
//! Supports configuration via environment variables:
//! - `SEMLAYER_DB_DRIVER`: postgres, mysql, singlestore, sqlite, duckdb
//! - `SEMLAYER_DB_HOST`: Database server hostname (or file path for sqlite/duckdb)
//! - `SEMLAYER_DB_NAME`: Database name
//! - `SEMLAYER_DB_PORT`: Port (optional, uses driver default)

use std::env;

use crate::sql::Dialect;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: postgres, mysql, singlestore, sqlite, duckdb")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Supported database drivers. Mirrors [`crate::sql::Dialect`] one-to-one;
/// kept as a distinct type since connection configuration carries
/// driver-specific fields (host/port/credentials) that dialect selection
/// alone doesn't need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    MySql,
    SingleStore,
    Sqlite,
    DuckDb,
}

impl Driver {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            "mysql" => Ok(Driver::MySql),
            "singlestore" | "memsql" => Ok(Driver::SingleStore),
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "duckdb" | "duck" => Ok(Driver::DuckDb),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::MySql => "mysql",
            Driver::SingleStore => "singlestore",
            Driver::Sqlite => "sqlite",
            Driver::DuckDb => "duckdb",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Driver::Postgres => 5432,
            Driver::MySql | Driver::SingleStore => 3306,
            Driver::Sqlite | Driver::DuckDb => 0,
        }
    }

    /// The SQL dialect this driver corresponds to.
    pub fn dialect(&self) -> Dialect {
        match self {
            Driver::Postgres => Dialect::Postgres,
            Driver::MySql => Dialect::MySql,
            Driver::SingleStore => Dialect::SingleStore,
            Driver::Sqlite => Dialect::Sqlite,
            Driver::DuckDb => Dialect::DuckDb,
        }
    }

    fn is_file_based(&self) -> bool {
        matches!(self, Driver::Sqlite | Driver::DuckDb)
    }
}

/// Database connection configuration for the host embedding the core. The
/// core itself never opens connections — this only feeds the caller's own
/// `Executor` implementation.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub driver: Driver,
    pub host: String,
    pub database: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConnectionConfig {
    pub fn postgres(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver: Driver::Postgres,
            host: host.into(),
            database: database.into(),
            port: None,
            username: None,
            password: None,
        }
    }

    /// For sqlite/duckdb, "host" is the file path (or `:memory:`).
    pub fn file_based(driver: Driver, path: impl Into<String>) -> Self {
        Self {
            driver,
            host: path.into(),
            database: String::new(),
            port: None,
            username: None,
            password: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let driver_str = env::var("SEMLAYER_DB_DRIVER")
            .map_err(|_| ConnectionError::MissingEnvVar("SEMLAYER_DB_DRIVER".to_string()))?;
        let driver = Driver::from_str(&driver_str)?;

        let host = env::var("SEMLAYER_DB_HOST")
            .map_err(|_| ConnectionError::MissingEnvVar("SEMLAYER_DB_HOST".to_string()))?;

        let database = if driver.is_file_based() {
            env::var("SEMLAYER_DB_NAME").unwrap_or_default()
        } else {
            env::var("SEMLAYER_DB_NAME")
                .map_err(|_| ConnectionError::MissingEnvVar("SEMLAYER_DB_NAME".to_string()))?
        };

        let port = env::var("SEMLAYER_DB_PORT").ok().and_then(|p| p.parse().ok());
        let username = env::var("SEMLAYER_DB_USER").ok();
        let password = env::var("SEMLAYER_DB_PASSWORD").ok();

        Ok(Self {
            driver,
            host,
            database,
            port,
            username,
            password,
        })
    }

    /// Build an illustrative connection string. Real driver adapters live
    /// outside the core; this exists so a host can bootstrap one.
    pub fn to_connection_string(&self) -> String {
        match self.driver {
            Driver::Postgres => self.build_uri_connection_string("postgresql"),
            Driver::MySql | Driver::SingleStore => self.build_uri_connection_string("mysql"),
            Driver::Sqlite | Driver::DuckDb => self.build_file_connection_string(),
        }
    }

    fn build_uri_connection_string(&self, scheme: &str) -> String {
        let port = self.port.unwrap_or_else(|| self.driver.default_port());
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            format!(
                "{}://{}:{}@{}:{}/{}",
                scheme, user, pass, self.host, port, self.database
            )
        } else {
            format!("{}://{}:{}/{}", scheme, self.host, port, self.database)
        }
    }

    fn build_file_connection_string(&self) -> String {
        if self.host.is_empty() || self.host == ":memory:" {
            ":memory:".to_string()
        } else {
            self.host.clone()
        }
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.as_str()
    }
}
