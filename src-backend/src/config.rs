//! Backend configuration, read from the environment (and `.env`).

use std::path::PathBuf;

use thiserror::Error;

use crate::realtime::DEFAULT_CAPACITY;

pub const DEFAULT_DATABASE_PATH: &str = "noto.db";
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub database_path: PathBuf,
    /// Origin that share links are built on
    pub base_url: String,
    /// File logging is off when unset
    pub log_dir: Option<PathBuf>,
    pub feed_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            base_url: DEFAULT_BASE_URL.to_string(),
            log_dir: None,
            feed_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl BackendConfig {
    /// Load `.env` if present, then read the `NOTO_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or empty values take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let feed_capacity = match get("NOTO_FEED_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "NOTO_FEED_CAPACITY",
                        value: raw,
                    })
                }
            },
            None => defaults.feed_capacity,
        };

        Ok(Self {
            database_path: get("NOTO_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            base_url: get("NOTO_BASE_URL").unwrap_or(defaults.base_url),
            log_dir: get("NOTO_LOG_DIR").map(PathBuf::from),
            feed_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BackendConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BackendConfig::default());
        assert_eq!(config.database_path, PathBuf::from("noto.db"));
        assert_eq!(config.feed_capacity, 256);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("NOTO_DATABASE_PATH", "/tmp/lists.db"),
            ("NOTO_BASE_URL", "https://noto.app"),
            ("NOTO_LOG_DIR", "/var/log/noto"),
            ("NOTO_FEED_CAPACITY", " 32 "),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/lists.db"));
        assert_eq!(config.base_url, "https://noto.app");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/noto")));
        assert_eq!(config.feed_capacity, 32);
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = BackendConfig::from_lookup(lookup(&[("NOTO_LOG_DIR", ""), ("NOTO_BASE_URL", "  ")])).unwrap();
        assert!(config.log_dir.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_bad_capacity() {
        for bad in ["0", "-3", "lots"] {
            let err = BackendConfig::from_lookup(lookup(&[("NOTO_FEED_CAPACITY", bad)])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidNumber {
                    name: "NOTO_FEED_CAPACITY",
                    value: bad.to_string(),
                }
            );
        }
    }
}
