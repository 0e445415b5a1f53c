//! Console configuration.
//!
//! Values come from `CONSOLE_*` environment variables; anything unset falls
//! back to the default.
//!
//! | Variable | Default |
//! |---|---|
//! | `CONSOLE_RECENT_ORDERS_LIMIT` | 5 |
//! | `CONSOLE_MIN_PASSWORD_LENGTH` | 6 |
//! | `CONSOLE_REQUEST_TIMEOUT_MS` | 5000 |
//! | `CONSOLE_SHUTDOWN_TIMEOUT_SECS` | 5 |
//! | `CONSOLE_BROADCAST_CAPACITY` | 64 |
//! | `CONSOLE_LOG_LEVEL` | `info` |

use crate::error::ConfigError;
use merchant_console_runtime::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for the console and its stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Rows in the dashboard's recent-orders table
    pub recent_orders_limit: usize,
    /// Minimum password length accepted at login
    pub min_password_length: usize,
    /// How long a command waits for its resolving event
    pub request_timeout_ms: u64,
    /// Grace period for in-flight effects at shutdown
    pub shutdown_timeout_secs: u64,
    /// Store action broadcast buffer
    pub broadcast_capacity: usize,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            recent_orders_limit: 5,
            min_password_length: 6,
            request_timeout_ms: 5_000,
            shutdown_timeout_secs: 5,
            broadcast_capacity: 64,
            log_level: "info".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Loads the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to something unparsable
    /// or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name
    /// to its value
    ///
    /// # Errors
    ///
    /// Same as [`ConsoleConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            recent_orders_limit: parse_var(
                &lookup,
                "CONSOLE_RECENT_ORDERS_LIMIT",
                defaults.recent_orders_limit,
            )?,
            min_password_length: parse_var(
                &lookup,
                "CONSOLE_MIN_PASSWORD_LENGTH",
                defaults.min_password_length,
            )?,
            request_timeout_ms: parse_var(
                &lookup,
                "CONSOLE_REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            )?,
            shutdown_timeout_secs: parse_var(
                &lookup,
                "CONSOLE_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            )?,
            broadcast_capacity: parse_var(
                &lookup,
                "CONSOLE_BROADCAST_CAPACITY",
                defaults.broadcast_capacity,
            )?,
            log_level: lookup("CONSOLE_LOG_LEVEL")
                .map(|level| level.trim().to_string())
                .filter(|level| !level.is_empty())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges
    ///
    /// # Errors
    ///
    /// [`ConfigError::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Validation("request_timeout_ms must be > 0".to_string()));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation("broadcast_capacity must be > 0".to_string()));
        }
        Ok(())
    }

    /// Store settings derived from this configuration
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, self.shutdown_timeout())
    }

    /// Wait bound for a command's resolving event
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Grace period for [`crate::console::OrderConsole::shutdown`]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ConsoleConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.store_config().broadcast_capacity, 64);
    }

    #[test]
    fn overrides() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            ("CONSOLE_RECENT_ORDERS_LIMIT", "10"),
            ("CONSOLE_MIN_PASSWORD_LENGTH", " 8 "),
            ("CONSOLE_SHUTDOWN_TIMEOUT_SECS", "1"),
            ("CONSOLE_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.recent_orders_limit, 10);
        assert_eq!(config.min_password_length, 8);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(1));
        assert_eq!(config.store_config().default_shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let err = ConsoleConfig::from_lookup(lookup(&[("CONSOLE_REQUEST_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "CONSOLE_REQUEST_TIMEOUT_MS",
                ..
            }
        ));
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = ConsoleConfig::from_lookup(lookup(&[("CONSOLE_BROADCAST_CAPACITY", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
