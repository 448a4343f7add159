//! Configuration for the archiver.
//!
//! Configuration comes from an optional TOML file, with support for
//! environment variable interpolation using `${VAR_NAME}` syntax, layered
//! under the environment-style variables the deployment sets directly:
//!
//! | Variable         | Overrides                          |
//! |------------------|------------------------------------|
//! | `DB_HOST`        | `database.host`                    |
//! | `DB_PORT`        | `database.port`                    |
//! | `DB_NAME`        | `database.database`                |
//! | `DB_USER`        | `database.user`                    |
//! | `DB_PASSWORD`    | `database.password`                |
//! | `BACKUP_DIR`     | `archive.backup_dir`               |
//! | `DAYS_TO_BACKUP` | `archive.retention_days`           |
//! | `INTERVAL`       | `archive.interval_secs`            |
//!
//! Any `DB_*` variable switches an unconfigured database to PostgreSQL.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "postgres"
//! host = "db"
//! database = "records"
//! user = "archivist"
//! password = "${DB_PASSWORD}"
//!
//! [archive]
//! backup_dir = "/backups"
//! interval_secs = 60
//! ```

mod archive;
mod database;
mod observability;
mod seed;
mod supervisor;

use std::{path::Path, str::FromStr};

pub use archive::*;
pub use database::*;
pub use observability::*;
pub use seed::*;
use serde::{Deserialize, Serialize};
pub use supervisor::*;

/// Root configuration.
///
/// All sections are optional with defaults matching the behaviour of a bare
/// environment-configured deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchivistConfig {
    /// Database holding the `records` table.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Archive cycle settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Seeding settings.
    #[serde(default)]
    pub seed: SeedConfig,

    /// Supervisor loop settings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ArchivistConfig {
    /// Load configuration from `path` if given, otherwise from the environment alone.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string, then apply environment overrides.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let mut config: ArchivistConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ArchivistConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        #[cfg(feature = "database-postgres")]
        {
            let host = env_var("DB_HOST");
            let port = env_var("DB_PORT")
                .map(|v| parse_env_var::<u16>("DB_PORT", &v))
                .transpose()?;
            let name = env_var("DB_NAME");
            let user = env_var("DB_USER");
            let password = env_var("DB_PASSWORD");

            let any_set = host.is_some()
                || port.is_some()
                || name.is_some()
                || user.is_some()
                || password.is_some();

            if any_set && self.database.is_none() {
                self.database = DatabaseConfig::Postgres(PostgresConfig::default());
            }

            if let DatabaseConfig::Postgres(pg) = &mut self.database {
                if let Some(host) = host {
                    pg.host = host;
                }
                if let Some(port) = port {
                    pg.port = port;
                }
                if let Some(name) = name {
                    pg.database = name;
                }
                if let Some(user) = user {
                    pg.user = user;
                }
                if password.is_some() {
                    pg.password = password;
                }
            }
        }

        if let Some(dir) = env_var("BACKUP_DIR") {
            self.archive.backup_dir = dir.into();
        }
        if let Some(days) = env_var("DAYS_TO_BACKUP") {
            self.archive.retention_days = Some(parse_env_var("DAYS_TO_BACKUP", &days)?);
        }
        if let Some(interval) = env_var("INTERVAL") {
            self.archive.interval_secs = parse_env_var("INTERVAL", &interval)?;
        }

        Ok(())
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.archive.validate()?;
        self.seed.validate()?;
        self.supervisor.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Environment variable {name} has invalid value {value:?}")]
    InvalidEnvVar { name: String, value: String },

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value: value.to_string(),
        })
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid");
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
