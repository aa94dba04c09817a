pub mod flush_strategy;
pub mod log_level;

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_bool_from_anything;

use crate::config::{flush_strategy::FlushStrategy, log_level::LogLevel};
use crate::flushing::FlushSettings;
use crate::lifecycle::SuspensionSettings;
use crate::{CONFIG_FILE_NAME, ENV_PREFIX};

pub use flush_strategy::PeriodicStrategy;

#[derive(Debug, PartialEq, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub flush_strategy: FlushStrategy,
    /// Per-client bound on a suspension-triggered flush, in seconds
    pub flush_timeout: u64,
    /// Bound on the whole suspension-triggered flush, in seconds
    pub shutdown_timeout: u64,
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub flush_on_suspend: bool,
    /// Entries a buffered target keeps before dropping the oldest
    pub buffer_capacity: usize,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LogLevel::default(),
            flush_strategy: FlushStrategy::Default,
            flush_timeout: 5,
            shutdown_timeout: 10,
            flush_on_suspend: true,
            buffer_capacity: 10_000,
            log_file: "lazyflush.log".to_string(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn flush_settings(&self) -> FlushSettings {
        FlushSettings {
            interval: self.flush_strategy.interval(),
        }
    }

    #[must_use]
    pub fn suspension_settings(&self) -> SuspensionSettings {
        let flush_timeout = Duration::from_secs(self.flush_timeout);
        // the overall bound can never be tighter than a single client's
        let shutdown_timeout = Duration::from_secs(self.shutdown_timeout).max(flush_timeout);
        SuspensionSettings {
            flush_timeout,
            shutdown_timeout,
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    ParseError(String),
    #[error("unsupported config field: {0}")]
    UnsupportedField(String),
}

/// Loads the configuration from `lazyflush.yaml` in `config_directory`,
/// overridden by `LAZYFLUSH_` prefixed environment variables.
pub fn get_config(config_directory: &Path) -> Result<Config, ConfigError> {
    let path = config_directory.join(CONFIG_FILE_NAME);
    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    let config = figment.extract().map_err(|err| match err.kind {
        figment::error::Kind::UnknownField(field, _) => ConfigError::UnsupportedField(field),
        _ => ConfigError::ParseError(err.to_string()),
    })?;

    Ok(config)
}
