use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scorer::MAX_CONFIDENCE;
use crate::selector::DEFAULT_MIN_CONFIDENCE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("min_confidence must be between 0 and 100, got {0}")]
    ConfidenceOutOfRange(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Lowest confidence a candidate needs to be proposed.
    pub min_confidence: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl MatchConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_confidence > MAX_CONFIDENCE {
            return Err(ConfigError::ConfidenceOutOfRange(self.min_confidence));
        }
        Ok(())
    }
}
