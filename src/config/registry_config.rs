//! Model registry lifecycle settings from environment variables.

use super::EnvReader;
use crate::application::ml::model_config::RegistryConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Registry environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEnvConfig {
    pub retention: usize,
    pub max_age_hours: u64,
    pub max_concurrent_trainings: usize,
    /// Directory of the file-backed model store; unset keeps models in memory.
    pub store_dir: Option<PathBuf>,
}

impl Default for RegistryEnvConfig {
    fn default() -> Self {
        Self {
            retention: 3,
            max_age_hours: 24,
            max_concurrent_trainings: 2,
            store_dir: None,
        }
    }
}

impl RegistryEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = EnvReader::new(lookup);
        let d = Self::default();
        Ok(Self {
            retention: env.parse_usize("MODEL_RETENTION", d.retention)?,
            max_age_hours: env.parse_u64("MODEL_MAX_AGE_HOURS", d.max_age_hours)?,
            max_concurrent_trainings: env
                .parse_usize("MAX_CONCURRENT_TRAININGS", d.max_concurrent_trainings)?,
            store_dir: env
                .get("MODEL_STORE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn to_registry_config(&self) -> Result<RegistryConfig> {
        let config = RegistryConfig {
            retention: self.retention,
            max_model_age: Duration::from_secs(self.max_age_hours.saturating_mul(3600)),
            max_concurrent_trainings: self.max_concurrent_trainings,
        };
        config.validate().context("Invalid registry config")?;
        Ok(config)
    }
}
