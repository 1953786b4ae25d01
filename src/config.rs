//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Service name, used in logs
pub const SERVICE_NAME: &str = "redis-kv-store";

/// One-line service description
pub const SERVICE_DESCRIPTION: &str = "Store short-lived or persistent key-value data";

// == Config Error ==
/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `APP_PROFILE` names no known profile
    #[error("unknown profile '{0}' (expected test, dev or prod)")]
    UnknownProfile(String),
}

// == Profile ==
/// Deployment profile selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// In-memory store, for tests and local experiments
    Test,
    /// Redis store with verbose logging
    Development,
    /// Redis store
    #[default]
    Production,
}

impl Profile {
    /// Whether this profile runs against the in-memory store.
    pub fn uses_memory_store(self) -> bool {
        matches!(self, Profile::Test)
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Profile::Development => "redis_kv_store=debug,tower_http=debug",
            Profile::Test | Profile::Production => "redis_kv_store=info,tower_http=info",
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "testing" => Ok(Profile::Test),
            "dev" | "development" => Ok(Profile::Development),
            "prod" | "production" => Ok(Profile::Production),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Test => "test",
            Profile::Development => "development",
            Profile::Production => "production",
        };
        f.write_str(name)
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment profile
    pub profile: Profile,
    /// Redis connection string
    pub redis_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweeper interval in milliseconds
    pub sweep_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `APP_PROFILE` - `test`, `dev` or `prod` (default: prod)
    /// - `REDIS_URL` - Redis connection string (default: redis://redis:6379/0)
    /// - `SERVER_PORT` - HTTP server port (default: 5000)
    /// - `SWEEP_INTERVAL_MS` - Expiry sweep frequency in milliseconds (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let profile = match env::var("APP_PROFILE") {
            Ok(name) => name.parse()?,
            Err(_) => defaults.profile,
        };

        Ok(Self {
            profile,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval_ms: env::var("SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.sweep_interval_ms),
        })
    }

    /// Sweeper interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::Production,
            redis_url: "redis://redis:6379/0".to_string(),
            server_port: 5000,
            sweep_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.profile, Profile::Production);
        assert_eq!(config.redis_url, "redis://redis:6379/0");
        assert_eq!(config.server_port, 5000);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("APP_PROFILE");
        env::remove_var("REDIS_URL");
        env::remove_var("SERVER_PORT");
        env::remove_var("SWEEP_INTERVAL_MS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.profile, Profile::Production);
        assert_eq!(config.server_port, 5000);
        assert_eq!(config.sweep_interval_ms, 1000);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("test".parse(), Ok(Profile::Test));
        assert_eq!("DEV".parse(), Ok(Profile::Development));
        assert_eq!("development".parse(), Ok(Profile::Development));
        assert_eq!(" prod ".parse(), Ok(Profile::Production));
        assert_eq!(
            "staging".parse::<Profile>(),
            Err(ConfigError::UnknownProfile("staging".to_string()))
        );
    }

    #[test]
    fn test_profile_behaviour() {
        assert!(Profile::Test.uses_memory_store());
        assert!(!Profile::Production.uses_memory_store());
        assert!(Profile::Development.default_log_filter().contains("debug"));
        assert_eq!(Profile::Development.to_string(), "development");
    }
}
