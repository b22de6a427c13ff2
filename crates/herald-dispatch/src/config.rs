//! Dispatcher configuration.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable selecting the [`DrainPolicy`].
pub const DRAIN_POLICY_VAR: &str = "HERALD_DRAIN_POLICY";

/// Environment variable controlling warnings for events without handlers.
pub const WARN_ON_UNHANDLED_VAR: &str = "HERALD_WARN_ON_UNHANDLED";

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be parsed.
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        /// The variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// What would have been accepted.
        expected: &'static str,
    },
}

/// What happens to the rest of the queue when a handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Stop at the first failure; later actions are not executed.
    #[default]
    FailFast,
    /// Execute every action, then report all failures together.
    RunAll,
}

impl FromStr for DrainPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Ok(Self::FailFast),
            "run_all" | "run-all" => Ok(Self::RunAll),
            _ => Err(ConfigError::InvalidValue {
                key: DRAIN_POLICY_VAR,
                value: value.to_owned(),
                expected: "fail_fast or run_all",
            }),
        }
    }
}

impl fmt::Display for DrainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FailFast => "fail_fast",
            Self::RunAll => "run_all",
        })
    }
}

/// Settings shared by every aggregator created from one boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Failure policy of the drain loop.
    pub drain_policy: DrainPolicy,
    /// Log events published without handlers at `warn` (otherwise `debug`).
    pub warn_on_unhandled: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            drain_policy: DrainPolicy::FailFast,
            warn_on_unhandled: true,
        }
    }
}

impl DispatchConfig {
    /// Reads the configuration from the process environment. Unset variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(DRAIN_POLICY_VAR) {
            config.drain_policy = value.parse()?;
        }
        if let Some(value) = lookup(WARN_ON_UNHANDLED_VAR) {
            let parsed: Result<bool, _> = value.trim().parse();
            config.warn_on_unhandled = parsed.map_err(|_| ConfigError::InvalidValue {
                key: WARN_ON_UNHANDLED_VAR,
                value,
                expected: "true or false",
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ConfigError, DispatchConfig, DrainPolicy};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        let config = DispatchConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, DispatchConfig::default());
        assert_eq!(config.drain_policy, DrainPolicy::FailFast);
        assert!(config.warn_on_unhandled);
    }

    #[test]
    fn test_reads_both_variables() {
        let config = DispatchConfig::from_lookup(lookup(&[
            ("HERALD_DRAIN_POLICY", "Run-All"),
            ("HERALD_WARN_ON_UNHANDLED", "false"),
        ]))
        .unwrap();

        assert_eq!(config.drain_policy, DrainPolicy::RunAll);
        assert!(!config.warn_on_unhandled);
    }

    #[test]
    fn test_rejects_unknown_drain_policy() {
        let result = DispatchConfig::from_lookup(lookup(&[("HERALD_DRAIN_POLICY", "retry")]));

        match result {
            Err(ConfigError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "HERALD_DRAIN_POLICY");
                assert_eq!(value, "retry");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_boolean_warning_flag() {
        let result = DispatchConfig::from_lookup(lookup(&[("HERALD_WARN_ON_UNHANDLED", "loud")]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "HERALD_WARN_ON_UNHANDLED",
                ..
            })
        ));
    }

    #[test]
    fn test_drain_policy_display_round_trips_through_from_str() {
        for policy in [DrainPolicy::FailFast, DrainPolicy::RunAll] {
            assert_eq!(policy.to_string().parse::<DrainPolicy>().unwrap(), policy);
        }
    }
}
