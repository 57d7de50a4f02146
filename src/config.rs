//! Container configuration.
//!
//! Settings come from code (the builder), from the environment
//! (`BEANS_VERBOSE`, `BEANS_RECOVER_PANICS`) or, with the `config` feature, from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{BeansError, BeansResult};

/// Environment variable enabling verbose lifecycle logging.
pub const VERBOSE_ENV: &str = "BEANS_VERBOSE";
/// Environment variable controlling panic recovery around user hooks.
pub const RECOVER_PANICS_ENV: &str = "BEANS_RECOVER_PANICS";

/// Settings of one container; children inherit their parent's settings.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::ContextConfig;
///
/// let config = ContextConfig::default();
/// assert!(!config.verbose);
/// assert!(config.recover_panics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContextConfig {
    /// Log lifecycle events at `debug` instead of `trace`.
    pub verbose: bool,
    /// Convert panics in hooks and factories into [`BeansError::Panicked`].
    pub recover_panics: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            recover_panics: true,
        }
    }
}

impl ContextConfig {
    /// Defaults overridden by the environment.
    pub fn from_env() -> BeansResult<Self> {
        let mut config = Self::default();
        if let Some(verbose) = env_flag(VERBOSE_ENV)? {
            config.verbose = verbose;
        }
        if let Some(recover) = env_flag(RECOVER_PANICS_ENV)? {
            config.recover_panics = recover;
        }
        Ok(config)
    }

    /// Parses a JSON object; missing fields keep their defaults.
    ///
    /// ```rust
    /// # #[cfg(feature = "config")]
    /// # {
    /// use ferrous_beans::ContextConfig;
    ///
    /// let config = ContextConfig::from_json_str(r#"{ "verbose": true }"#).unwrap();
    /// assert!(config.verbose);
    /// assert!(config.recover_panics);
    /// # }
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> BeansResult<Self> {
        serde_json::from_str(json).map_err(|e| BeansError::Config(e.to_string()))
    }

    #[cfg(feature = "config")]
    pub fn to_json_string(&self) -> BeansResult<String> {
        serde_json::to_string(self).map_err(|e| BeansError::Config(e.to_string()))
    }
}

fn env_flag(name: &str) -> BeansResult<Option<bool>> {
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        other => Err(BeansError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}
