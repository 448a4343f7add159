use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Supervisor loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Fixed delay before re-seeding after a failed pass.
    /// Default: 5
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_backoff_secs() -> u64 {
    5
}

impl SupervisorConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_secs == 0 {
            return Err(ConfigError::Validation(
                "supervisor.backoff_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
