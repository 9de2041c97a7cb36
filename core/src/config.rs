//! Interaction configuration.
//!
//! [`InteractionConfig`] controls the pipeline policies that callers may want
//! to tune per interaction type or per deployment:
//!
//! - `wait_for_input`: an empty `run` input returns the instance untouched
//! - `validate_nested_when_invalid`: keep validating children after the
//!   parent's own fields failed, for complete diagnostics
//! - `bubble_nested_errors`: copy child errors into the parent's error map
//!   under dotted paths
//!
//! # Example
//!
//! ```
//! use composable_interactions_core::config::InteractionConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InteractionConfig::from_toml_str("wait_for_input = false")?;
//! assert!(!config.wait_for_input);
//! assert!(config.validate_nested_when_invalid);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`InteractionConfig::wait_for_input`]
pub const ENV_WAIT_FOR_INPUT: &str = "INTERACTIONS_WAIT_FOR_INPUT";

/// Environment variable overriding [`InteractionConfig::validate_nested_when_invalid`]
pub const ENV_VALIDATE_NESTED_WHEN_INVALID: &str = "INTERACTIONS_VALIDATE_NESTED_WHEN_INVALID";

/// Environment variable overriding [`InteractionConfig::bubble_nested_errors`]
pub const ENV_BUBBLE_NESTED_ERRORS: &str = "INTERACTIONS_BUBBLE_NESTED_ERRORS";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds something other than a boolean
    #[error("Invalid value for {var}: '{value}' (expected true/false)")]
    InvalidEnvValue {
        /// The variable name
        var: &'static str,
        /// The rejected value
        value: String,
    },

    /// The TOML document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Pipeline policies for an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Return immediately from `run` when no input is supplied
    pub wait_for_input: bool,

    /// Validate nested children even when the parent's own fields are invalid
    pub validate_nested_when_invalid: bool,

    /// Copy nested errors into the parent's error map during validation
    pub bubble_nested_errors: bool,
}

impl InteractionConfig {
    /// Defaults: wait for input, always validate nested, keep errors on children
    #[must_use]
    pub const fn new() -> Self {
        Self {
            wait_for_input: true,
            validate_nested_when_invalid: true,
            bubble_nested_errors: false,
        }
    }

    /// Set [`Self::wait_for_input`]
    #[must_use]
    pub const fn with_wait_for_input(mut self, wait: bool) -> Self {
        self.wait_for_input = wait;
        self
    }

    /// Set [`Self::validate_nested_when_invalid`]
    #[must_use]
    pub const fn with_validate_nested_when_invalid(mut self, validate: bool) -> Self {
        self.validate_nested_when_invalid = validate;
        self
    }

    /// Set [`Self::bubble_nested_errors`]
    #[must_use]
    pub const fn with_bubble_nested_errors(mut self, bubble: bool) -> Self {
        self.bubble_nested_errors = bubble;
        self
    }

    /// Defaults overridden by `INTERACTIONS_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvValue`] if a variable is set to a
    /// non-boolean value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by values from `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvValue`] if a value is not a boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(value) = lookup(ENV_WAIT_FOR_INPUT) {
            config.wait_for_input = parse_bool(ENV_WAIT_FOR_INPUT, &value)?;
        }
        if let Some(value) = lookup(ENV_VALIDATE_NESTED_WHEN_INVALID) {
            config.validate_nested_when_invalid =
                parse_bool(ENV_VALIDATE_NESTED_WHEN_INVALID, &value)?;
        }
        if let Some(value) = lookup(ENV_BUBBLE_NESTED_ERRORS) {
            config.bubble_nested_errors = parse_bool(ENV_BUBBLE_NESTED_ERRORS, &value)?;
        }
        tracing::debug!(?config, "Loaded interaction configuration");
        Ok(config)
    }

    /// Parse from a TOML document; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        toml::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = InteractionConfig::default();
        assert!(config.wait_for_input);
        assert!(config.validate_nested_when_invalid);
        assert!(!config.bubble_nested_errors);
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_WAIT_FOR_INPUT, "false"),
            (ENV_BUBBLE_NESTED_ERRORS, "YES"),
        ]
        .into_iter()
        .collect();

        let config = InteractionConfig::from_lookup(|var| vars.get(var).map(ToString::to_string));
        assert_eq!(
            config,
            Ok(InteractionConfig::new()
                .with_wait_for_input(false)
                .with_bubble_nested_errors(true))
        );
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let config = InteractionConfig::from_lookup(|var| {
            (var == ENV_WAIT_FOR_INPUT).then(|| "maybe".to_string())
        });
        assert_eq!(
            config,
            Err(ConfigError::InvalidEnvValue {
                var: ENV_WAIT_FOR_INPUT,
                value: "maybe".to_string(),
            })
        );
    }

    #[test]
    fn test_toml() {
        let config = InteractionConfig::from_toml_str(
            "validate_nested_when_invalid = false\nbubble_nested_errors = true",
        );
        assert_eq!(
            config,
            Ok(InteractionConfig::new()
                .with_validate_nested_when_invalid(false)
                .with_bubble_nested_errors(true))
        );
        assert!(matches!(
            InteractionConfig::from_toml_str("wait_for_input = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
