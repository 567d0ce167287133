//! Merge settings, read from operator parameters.

use log::debug;
use thiserror::Error;

use crate::merge::{Merger, UNKNOWN};

/// Errors raised while reading operator parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown parameter '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for parameter '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Configuration of a merge operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Classification given to cases on which the sources disagree.
    pub unknown: String,
    /// Normalize inputs before averaging.
    pub normalize: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            unknown: UNKNOWN.to_string(),
            normalize: true,
        }
    }
}

impl MergeConfig {
    /// Build a configuration from `key=value` pairs, starting from the defaults.
    ///
    /// Recognized keys are `unknown` (a non-empty label) and `normalize` (`true` or
    /// `false`). Later pairs override earlier ones.
    pub fn from_params<K, V>(params: &[(K, V)]) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let invalid = || ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };
            match key {
                "unknown" => {
                    if value.is_empty() {
                        return Err(invalid());
                    }
                    config.unknown = value.to_string();
                }
                "normalize" => {
                    config.normalize = value.parse().map_err(|_| invalid())?;
                }
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            }
        }
        debug!("config: {:?}", config);
        Ok(config)
    }
}

impl From<&MergeConfig> for Merger {
    fn from(config: &MergeConfig) -> Self {
        Merger::new(config.unknown.clone())
    }
}
