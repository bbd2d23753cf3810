// Configuration module for routescan
// Reads from environment variables with sensible defaults

use crate::extractor::http::Strictness;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

pub const DEFAULT_APP_CLASS: &str = "FastAPI";
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
pub const DEFAULT_WORKDIR: &str = "temp_repos";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Which HTTP verbs count as route decorators (ROUTESCAN_STRICTNESS)
    pub strictness: Strictness,

    /// Class whose instantiation marks an entry point (ROUTESCAN_APP_CLASS)
    pub app_class: String,

    /// Files above this size are not read (ROUTESCAN_MAX_FILE_BYTES)
    pub max_file_bytes: u64,

    /// Directory for temporary clones (ROUTESCAN_WORKDIR)
    pub workdir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strictness: Strictness::Standard,
            app_class: DEFAULT_APP_CLASS.to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            workdir: DEFAULT_WORKDIR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("ROUTESCAN_STRICTNESS") {
            parse_into(&mut config.strictness, "ROUTESCAN_STRICTNESS", &val);
        }

        if let Some(val) = lookup("ROUTESCAN_APP_CLASS") {
            let trimmed = val.trim();
            if is_identifier(trimmed) {
                config.app_class = trimmed.to_string();
            } else {
                warn!(
                    value = %val,
                    default = %config.app_class,
                    "invalid ROUTESCAN_APP_CLASS, using default"
                );
            }
        }

        if let Some(val) = lookup("ROUTESCAN_MAX_FILE_BYTES") {
            parse_into(&mut config.max_file_bytes, "ROUTESCAN_MAX_FILE_BYTES", &val);
        }

        if let Some(val) = lookup("ROUTESCAN_WORKDIR") {
            if !val.trim().is_empty() {
                config.workdir = val.trim().to_string();
            }
        }

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }
}

fn parse_into<T>(slot: &mut T, key: &str, raw: &str)
where
    T: FromStr + std::fmt::Debug,
{
    match raw.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(value = %raw, default = ?slot, "invalid {key}, using default"),
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.strictness, Strictness::Standard);
        assert_eq!(config.app_class, "FastAPI");
        assert_eq!(config.max_file_bytes, 2 * 1024 * 1024);
        assert_eq!(config.workdir, "temp_repos");
    }

    #[test]
    fn overrides_and_invalid_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ROUTESCAN_STRICTNESS", "relaxed"),
            ("ROUTESCAN_APP_CLASS", "not a class"),
            ("ROUTESCAN_MAX_FILE_BYTES", "lots"),
            ("ROUTESCAN_WORKDIR", "/tmp/clones"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.strictness, Strictness::Relaxed);
        assert_eq!(config.app_class, "FastAPI");
        assert_eq!(config.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert_eq!(config.workdir, "/tmp/clones");
    }
}
