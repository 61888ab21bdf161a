//! Environment variable parsing helpers
//!
//! Provides ergonomic helpers for reading configuration from environment variables.

use anyhow::{anyhow, Result};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Extension trait for reading configuration through a variable lookup.
///
/// Implemented for any `Fn(&str) -> Option<String>`, so `env_opt` reads the
/// process environment and tests can pass a map-backed closure. Lookups
/// must report empty values as `None`.
pub trait ConfigExt {
    fn lookup(&self, name: &str) -> Option<String>;

    /// Get a variable with a default value.
    ///
    /// # Example
    /// ```ignore
    /// let sslmode = env_opt.env_or("REPLICATION_SSLMODE", "prefer");
    /// ```
    fn env_or(&self, name: &str, default: &str) -> String {
        self.lookup(name).unwrap_or_else(|| default.to_string())
    }

    /// `true` if the value is "true" (case-insensitive), otherwise `default`.
    fn env_bool(&self, name: &str, default: bool) -> bool {
        self.lookup(name)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    /// Get a variable parsed as a specific type.
    ///
    /// Returns `default` if unset and an error if the value does not parse.
    fn env_parse<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.lookup(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid {} '{}': {}", name, value, e)),
        }
    }

    /// Get a comma-separated variable as a list.
    fn env_list(&self, name: &str) -> Vec<String> {
        self.lookup(name)
            .map(|v| split_list(&v))
            .unwrap_or_default()
    }
}

impl<F> ConfigExt for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Get an environment variable, treating an empty value as unset.
pub fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Split a comma-separated value into trimmed, non-empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Container environment helpers.
pub struct ContainerEnv;

impl ContainerEnv {
    /// Hostname of this container, used to tag events.
    pub fn hostname() -> String {
        env_opt.env_or("HOSTNAME", "unknown")
    }

    /// Endpoint lifecycle events are POSTed to, if configured.
    pub fn events_endpoint() -> Option<String> {
        env_opt("ENTRYPOINT_EVENTS_URL")
    }
}
