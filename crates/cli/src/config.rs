//! `bandi.toml` handling

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bandi_reconcile::MatchConfig;
use serde::Deserialize;

pub const DEFAULT_DB_PATH: &str = "bandi.db";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub matching: MatchConfig,
}

impl AppConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_content).context("invalid config file")?;
        config.matching.validate()?;
        Ok(config)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn db_path(&self, cli_db: Option<&Path>) -> PathBuf {
        cli_db
            .map(Path::to_path_buf)
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    pub fn min_confidence(&self, cli_value: Option<u8>) -> u8 {
        cli_value.unwrap_or(self.matching.min_confidence)
    }
}
