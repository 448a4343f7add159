use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Database configuration.
///
/// The database holds the single `records` table that is seeded and drained.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum DatabaseConfig {
    /// No database configured. Rejected by validation; every command needs one.
    #[default]
    None,

    /// SQLite database. Handy for local runs and tests.
    #[cfg(feature = "database-sqlite")]
    Sqlite(SqliteConfig),

    /// PostgreSQL database.
    #[cfg(feature = "database-postgres")]
    Postgres(PostgresConfig),
}

impl DatabaseConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, DatabaseConfig::None)
    }

    /// Whether migrations should run before the first store operation.
    pub fn run_migrations(&self) -> bool {
        match self {
            DatabaseConfig::None => false,
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(c) => c.run_migrations,
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(c) => c.run_migrations,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseConfig::None => Err(ConfigError::Validation(
                "A database must be configured ([database] section or DB_* variables)".into(),
            )),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(c) => c.validate(),
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(c) => c.validate(),
        }
    }
}

/// SQLite configuration.
#[cfg(feature = "database-sqlite")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    /// Use `:memory:` for an in-memory database (testing only).
    pub path: String,

    /// Create the database file if it doesn't exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Run migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// Enable WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_sqlite_max_connections")]
    pub max_connections: u32,
}

#[cfg(feature = "database-sqlite")]
impl SqliteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.is_empty() {
            return Err(ConfigError::Validation(
                "SQLite path cannot be empty".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "SQLite max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "database-sqlite")]
fn default_busy_timeout() -> u64 {
    5000 // 5 seconds
}

#[cfg(feature = "database-sqlite")]
fn default_sqlite_max_connections() -> u32 {
    5
}

/// PostgreSQL configuration.
///
/// Connection parameters are given individually rather than as a URL so they
/// map one-to-one onto the `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER` and
/// `DB_PASSWORD` environment variables.
#[cfg(feature = "database-postgres")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    /// Server host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Role to connect as.
    #[serde(default)]
    pub user: String,

    /// Password for `user`. Omit for trust/peer authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Run migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// SSL mode.
    #[serde(default)]
    pub ssl_mode: PostgresSslMode,
}

#[cfg(feature = "database-postgres")]
impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: String::new(),
            user: String::new(),
            password: None,
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            run_migrations: true,
            ssl_mode: PostgresSslMode::default(),
        }
    }
}

#[cfg(feature = "database-postgres")]
impl PostgresConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Validation(
                "PostgreSQL host cannot be empty".into(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation(
                "PostgreSQL port cannot be 0".into(),
            ));
        }
        if self.database.is_empty() {
            return Err(ConfigError::Validation(
                "PostgreSQL database name cannot be empty".into(),
            ));
        }
        if self.user.is_empty() {
            return Err(ConfigError::Validation(
                "PostgreSQL user cannot be empty".into(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Validation(
                "min_connections cannot exceed max_connections".into(),
            ));
        }
        Ok(())
    }

    /// Build sqlx connect options from the individual connection fields.
    pub fn connect_options(&self) -> sqlx::postgres::PgConnectOptions {
        let options = sqlx::postgres::PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .ssl_mode(self.ssl_mode.into());

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

/// PostgreSQL SSL mode.
#[cfg(feature = "database-postgres")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostgresSslMode {
    /// No SSL.
    Disable,
    /// Try SSL, fall back to non-SSL.
    #[default]
    Prefer,
    /// Require SSL.
    Require,
    /// Require SSL and verify server certificate.
    VerifyCa,
    /// Require SSL and verify server certificate and hostname.
    VerifyFull,
}

#[cfg(feature = "database-postgres")]
impl From<PostgresSslMode> for sqlx::postgres::PgSslMode {
    fn from(mode: PostgresSslMode) -> Self {
        match mode {
            PostgresSslMode::Disable => Self::Disable,
            PostgresSslMode::Prefer => Self::Prefer,
            PostgresSslMode::Require => Self::Require,
            PostgresSslMode::VerifyCa => Self::VerifyCa,
            PostgresSslMode::VerifyFull => Self::VerifyFull,
        }
    }
}

#[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
fn default_true() -> bool {
    true
}

#[cfg(feature = "database-postgres")]
fn default_host() -> String {
    "localhost".to_string()
}

#[cfg(feature = "database-postgres")]
fn default_port() -> u16 {
    5432
}

#[cfg(feature = "database-postgres")]
fn default_min_connections() -> u32 {
    1
}

#[cfg(feature = "database-postgres")]
fn default_max_connections() -> u32 {
    5
}

#[cfg(feature = "database-postgres")]
fn default_connect_timeout() -> u64 {
    10
}
