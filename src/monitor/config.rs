//! Runtime configuration from environment variables

use super::retry::RetryPolicy;
use std::env;
use std::time::Duration;

/// Configuration for the monitor runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Path to the SQLite database file
    pub db_path: String,

    /// Fetch attempts per tick before giving up
    pub max_attempts: u32,

    /// Delay between fetch attempts
    pub retry_delay: Duration,

    /// Poll interval for subscriptions created without an explicit one
    pub default_interval: Duration,
}

impl MonitorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `TRENDWATCH_DB_PATH` (default: trendwatch.db)
    /// - `FETCH_MAX_ATTEMPTS` (default: 3)
    /// - `FETCH_RETRY_DELAY_MS` (default: 5000)
    /// - `DEFAULT_POLL_INTERVAL_SECS` (default: 60)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("TRENDWATCH_DB_PATH")
                .unwrap_or_else(|_| "trendwatch.db".to_string()),

            max_attempts: env::var("FETCH_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),

            retry_delay: Duration::from_millis(
                env::var("FETCH_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5_000),
            ),

            default_interval: Duration::from_secs(
                env::var("DEFAULT_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Defaults when no env vars set
        env::remove_var("TRENDWATCH_DB_PATH");
        env::remove_var("FETCH_MAX_ATTEMPTS");
        env::remove_var("FETCH_RETRY_DELAY_MS");
        env::remove_var("DEFAULT_POLL_INTERVAL_SECS");

        let config = MonitorConfig::from_env();
        assert_eq!(config.db_path, "trendwatch.db");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(5_000));
        assert_eq!(config.default_interval, Duration::from_secs(60));

        // Overrides from env vars
        env::set_var("TRENDWATCH_DB_PATH", "/tmp/test.db");
        env::set_var("FETCH_MAX_ATTEMPTS", "5");
        env::set_var("FETCH_RETRY_DELAY_MS", "100");
        env::set_var("DEFAULT_POLL_INTERVAL_SECS", "10");

        let config = MonitorConfig::from_env();
        assert_eq!(config.db_path, "/tmp/test.db");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(100));
        assert_eq!(config.default_interval, Duration::from_secs(10));

        // Cleanup
        env::remove_var("TRENDWATCH_DB_PATH");
        env::remove_var("FETCH_MAX_ATTEMPTS");
        env::remove_var("FETCH_RETRY_DELAY_MS");
        env::remove_var("DEFAULT_POLL_INTERVAL_SECS");
    }
}
