use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Synthetic data seeding, run at the start of every supervisor pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    /// Records inserted per seeding pass.
    /// Default: 50
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Seeded timestamps are spread uniformly over this many trailing days.
    /// Default: 60
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            window_days: default_window_days(),
        }
    }
}

fn default_batch_size() -> u32 {
    50
}

fn default_window_days() -> u32 {
    60
}

impl SeedConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days as i64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Validation(
                "seed.batch_size must be at least 1".into(),
            ));
        }
        if self.window_days == 0 {
            return Err(ConfigError::Validation(
                "seed.window_days must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
