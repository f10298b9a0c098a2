//! Runtime configuration: database location and battle RNG seed.
//!
//! Values come from an optional YAML file, then environment variables, then
//! whatever the caller overrides explicitly (CLI flags).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Database used when nothing else is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./saves/conquest.db";

/// Environment variable overriding [`GameConfig::database_url`].
pub const ENV_DATABASE_URL: &str = "CONQUEST_DATABASE_URL";

/// Environment variable overriding [`GameConfig::rng_seed`].
pub const ENV_RNG_SEED: &str = "CONQUEST_RNG_SEED";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("io error: {0}")]
    Io(String),
    /// The file is not valid config YAML.
    #[error("invalid config yaml: {0}")]
    Yaml(String),
    /// The seed override is not a `u64`.
    #[error("invalid rng seed {0:?}")]
    InvalidSeed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e.to_string())
    }
}

/// Game configuration parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// SQLite connection URL, e.g. `sqlite://./saves/conquest.db` or
    /// `sqlite::memory:`.
    pub database_url: String,
    /// Seed for battle dice; `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let cfg = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(cfg)
    }

    /// Apply overrides from a variable lookup (normally the process env).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|s| !s.trim().is_empty()) {
            self.database_url = url;
        }
        if let Some(seed) = lookup(ENV_RNG_SEED) {
            let parsed = seed
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSeed(seed.clone()))?;
            self.rng_seed = Some(parsed);
        }
        Ok(self)
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|k| std::env::var(k).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_yaml_is_default() {
        let cfg = GameConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg, GameConfig::default());
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = GameConfig::from_yaml_str("rng_seed: 7\n").unwrap();
        assert_eq!(cfg.rng_seed, Some(7));
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_DATABASE_URL, "sqlite::memory:"),
            (ENV_RNG_SEED, "42"),
        ]
        .into_iter()
        .collect();
        let cfg = GameConfig::from_yaml_str("database_url: sqlite://other.db\n")
            .unwrap()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.rng_seed, Some(42));
    }

    #[test]
    fn bad_seed_is_an_error() {
        let res = GameConfig::default().with_overrides(|k| {
            (k == ENV_RNG_SEED).then(|| "forty-two".to_string())
        });
        assert!(matches!(res, Err(ConfigError::InvalidSeed(_))));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let res = GameConfig::from_yaml_str("database_url: [unterminated");
        assert!(matches!(res, Err(ConfigError::Yaml(_))));
    }
}
