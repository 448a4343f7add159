//! Archive cycle configuration.
//!
//! Controls where backup artifacts are written, how large each cycle's batch
//! is, and how long the drain loop waits between cycles.
//!
//! # Example
//!
//! ```toml
//! [archive]
//! backup_dir = "/backups"
//! interval_secs = 86400
//! batch_fraction = 0.1
//! extension = "sql"
//! format = "tuple"
//! delete_strategy = "reselect"
//! ```

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Archive cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Directory that receives one backup artifact per cycle.
    /// Default: /backups
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Seconds to wait between two cycles of the same drain loop.
    /// Default: 86400 (once per day)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Fraction of the remaining rows archived per cycle, floored, never below one row.
    /// Default: 0.1
    #[serde(default = "default_batch_fraction")]
    pub batch_fraction: f64,

    /// File extension of backup artifacts, without the leading dot.
    /// Default: sql
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How each archived record is rendered in the artifact.
    #[serde(default)]
    pub format: ArtifactFormat,

    /// Which rows the delete step removes.
    #[serde(default)]
    pub delete_strategy: DeleteStrategy,

    /// Retention window in days.
    ///
    /// Accepted for compatibility with existing deployments but not consulted
    /// when choosing rows: every cycle archives the oldest rows regardless of
    /// age. Setting it logs a warning at startup.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            interval_secs: default_interval_secs(),
            batch_fraction: default_batch_fraction(),
            extension: default_extension(),
            format: ArtifactFormat::default(),
            delete_strategy: DeleteStrategy::default(),
            retention_days: None,
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("/backups")
}

fn default_interval_secs() -> u64 {
    86_400
}

fn default_batch_fraction() -> f64 {
    0.1
}

fn default_extension() -> String {
    "sql".to_string()
}

/// Rendering of one archived record per artifact line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// `(id, 'name', YYYY-MM-DD HH:MM:SS)`
    #[default]
    Tuple,
    /// One JSON object per line.
    JsonLines,
}

/// Which rows a cycle deletes after writing its artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStrategy {
    /// Re-select the oldest rows inside the DELETE statement.
    ///
    /// Matches the written artifact only while no other writer changes the
    /// table between the select and the delete.
    #[default]
    Reselect,
    /// Select, write and delete the same ids inside one transaction.
    Selected,
}

impl ArchiveConfig {
    /// Get the inter-cycle interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Number of rows one cycle archives when `total` rows remain.
    ///
    /// `max(1, floor(total * batch_fraction))`. Returns 0 only for an empty table.
    pub fn batch_size(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        ((total as f64 * self.batch_fraction).floor() as i64).clamp(1, total)
    }

    /// True when a retention window is configured even though selection ignores it.
    pub fn retention_window_ignored(&self) -> bool {
        self.retention_days.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.batch_fraction > 0.0 && self.batch_fraction <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "archive.batch_fraction must be in (0, 1], got {}",
                self.batch_fraction
            )));
        }
        if self.extension.is_empty() {
            return Err(ConfigError::Validation(
                "archive.extension cannot be empty".into(),
            ));
        }
        if self.extension.contains(['/', '\\', '.']) {
            return Err(ConfigError::Validation(format!(
                "archive.extension must be a bare extension without dots or separators, got {:?}",
                self.extension
            )));
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "archive.backup_dir cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArchiveConfig::default();
        assert_eq!(config.backup_dir, PathBuf::from("/backups"));
        assert_eq!(config.interval_secs, 86_400);
        assert_eq!(config.batch_fraction, 0.1);
        assert_eq!(config.extension, "sql");
        assert_eq!(config.format, ArtifactFormat::Tuple);
        assert_eq!(config.delete_strategy, DeleteStrategy::Reselect);
        assert!(!config.retention_window_ignored());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            backup_dir = "/var/backups/records"
            interval_secs = 30
            batch_fraction = 0.25
            extension = "txt"
            format = "json_lines"
            delete_strategy = "selected"
            retention_days = 7
        "#;
        let config: ArchiveConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups/records"));
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.batch_fraction, 0.25);
        assert_eq!(config.extension, "txt");
        assert_eq!(config.format, ArtifactFormat::JsonLines);
        assert_eq!(config.delete_strategy, DeleteStrategy::Selected);
        assert_eq!(config.retention_days, Some(7));
        assert!(config.retention_window_ignored());
    }

    #[test]
    fn test_batch_size_is_a_tenth_floored_at_one() {
        let config = ArchiveConfig::default();
        assert_eq!(config.batch_size(0), 0);
        assert_eq!(config.batch_size(1), 1);
        assert_eq!(config.batch_size(9), 1);
        assert_eq!(config.batch_size(10), 1);
        assert_eq!(config.batch_size(19), 1);
        assert_eq!(config.batch_size(20), 2);
        assert_eq!(config.batch_size(45), 4);
        assert_eq!(config.batch_size(50), 5);
        assert_eq!(config.batch_size(1234), 123);
    }

    #[test]
    fn test_batch_size_never_exceeds_total() {
        let config = ArchiveConfig {
            batch_fraction: 1.0,
            ..Default::default()
        };
        assert_eq!(config.batch_size(7), 7);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            let config = ArchiveConfig {
                batch_fraction: fraction,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "fraction {fraction} accepted");
        }
    }

    #[test]
    fn test_extension_with_separator_rejected() {
        let config = ArchiveConfig {
            extension: "../sql".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ArchiveConfig {
            extension: ".sql".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
