use std::env;

use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::account::lockout::LockoutPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Enables `Secure` session cookies and HSTS.
    #[serde(default)]
    pub production: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub secret: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_max_age_secs")]
    pub max_age_secs: i64,
    #[serde(default = "default_session_update_age_secs")]
    pub update_age_secs: i64,
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::seconds(self.max_age_secs)
    }

    pub fn update_age(&self) -> Duration {
        Duration::seconds(self.update_age_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LockoutConfig {
    pub max_failed_attempts: u32,
    pub lockout_duration_ms: i64,
    pub max_update_retries: u32,
    /// Clear failure counters of an inactive account when it presents the
    /// correct password, before the inactive denial.
    pub reset_before_active_check: bool,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        let policy = LockoutPolicy::default();
        Self {
            max_failed_attempts: policy.max_failed_attempts,
            lockout_duration_ms: policy.lockout_duration.num_milliseconds(),
            max_update_retries: policy.max_update_retries,
            reset_before_active_check: policy.reset_before_active_check,
        }
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(config: &LockoutConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_attempts,
            lockout_duration: Duration::milliseconds(config.lockout_duration_ms),
            max_update_retries: config.max_update_retries,
            reset_before_active_check: config.reset_before_active_check,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub api_requests_per_window: u32,
    pub auth_requests_per_window: u32,
    pub max_tracked_keys: usize,
    pub cleanup_interval_secs: u64,
    /// Key callers by `x-forwarded-for` / `x-real-ip`. Only safe behind a
    /// proxy that overwrites those headers; otherwise the socket peer is used.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            api_requests_per_window: 100,
            auth_requests_per_window: 20,
            max_tracked_keys: 10_000,
            cleanup_interval_secs: 300,
            trust_forwarded_headers: false,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_cookie_name() -> String {
    "session-token".to_string()
}

fn default_session_max_age_secs() -> i64 {
    30 * 24 * 60 * 60
}

fn default_session_update_age_secs() -> i64 {
    24 * 60 * 60
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, SESSION__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: LOCKOUT__MAX_FAILED_ATTEMPTS=3 overrides lockout.max_failed_attempts
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_defaults_match_policy() {
        let config = LockoutConfig::default();
        let policy = LockoutPolicy::from(&config);

        assert_eq!(policy.max_failed_attempts, 5);
        assert_eq!(policy.lockout_duration, Duration::milliseconds(900_000));
        assert!(policy.reset_before_active_check);
    }

    #[test]
    fn test_session_durations() {
        let config = SessionConfig {
            secret: "s".to_string(),
            cookie_name: default_cookie_name(),
            max_age_secs: default_session_max_age_secs(),
            update_age_secs: default_session_update_age_secs(),
        };

        assert_eq!(config.max_age(), Duration::days(30));
        assert_eq!(config.update_age(), Duration::hours(24));
    }
}
