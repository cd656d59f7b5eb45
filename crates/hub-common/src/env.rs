//! Small helpers for loading configuration from environment variables,
//! shared by every binary's `Config::from_env`.

use std::env;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Read a required environment variable.
pub fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::Config(format!("{key} must be set")))
}

/// Read an environment variable, falling back to `default` when unset.
pub fn or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, falling back to `default` when
/// unset. Fails with `Error::Config` if the value is present but not
/// parseable.
pub fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} must be a valid value"))),
        Err(_) => Ok(default),
    }
}
