//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the tuning
//! constants for the greeting window, storage and transport retries.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Path of the SQLite database holding per-user greeting state
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory containing the response pool JSON files
    #[serde(default = "default_responses_dir")]
    pub responses_dir: String,
}

fn default_database_path() -> String {
    "fruitstand.db".to_string()
}

fn default_responses_dir() -> String {
    "responses".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fruitstand::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `TELEGRAM_TOKEN` is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            // Eg.. `APP_DEBUG=1 ./target/app` would set the `debug` key
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // Note: Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Fallback: Check environment variables directly if config didn't pick them up
        // This handles cases where automatic mapping might fail or behavior differs
        if settings.database_path == default_database_path() {
            if let Ok(val) = std::env::var("DATABASE_PATH") {
                if !val.is_empty() {
                    settings.database_path = val;
                }
            }
        }
        if settings.responses_dir == default_responses_dir() {
            if let Ok(val) = std::env::var("RESPONSES_DIR") {
                if !val.is_empty() {
                    settings.responses_dir = val;
                }
            }
        }

        Ok(settings)
    }
}

/// Length of one greeting window in milliseconds.
/// A user's window reopens once this much time has passed since their last
/// accepted fresh greeting; exactly 24 hours counts as elapsed.
pub const GREETING_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Upper bound (seconds) for a single storage call before the message is
/// dropped with an error. Keeps a wedged database from stalling the dispatch
/// loop indefinitely.
pub const STORAGE_OP_TIMEOUT_SECS: u64 = 5;

/// Initial backoff delay (milliseconds) for transport send retries.
pub const TRANSPORT_INITIAL_BACKOFF_MS: u64 = 250;
/// Ceiling (milliseconds) for a single transport retry delay.
pub const TRANSPORT_MAX_BACKOFF_MS: u64 = 4_000;
/// Number of transport send retries after the first attempt.
pub const TRANSPORT_MAX_RETRIES: usize = 3;

/// Idle lifetime (seconds) of a per-user lock entry.
/// Must stay far above the bounded handling time of a single message: an
/// idle lock may be evicted, a contended one must not be.
pub const USER_LOCK_TTL_SECS: u64 = 3_600;
/// Maximum number of per-user lock entries kept live.
pub const USER_LOCK_MAX_CAPACITY: u64 = 100_000;

/// Get per-user lock TTL from env or default.
///
/// Environment variable: `USER_LOCK_TTL_SECS`.
#[must_use]
pub fn get_user_lock_ttl() -> u64 {
    std::env::var("USER_LOCK_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(USER_LOCK_TTL_SECS)
}

/// Get per-user lock cache capacity from env or default.
///
/// Environment variable: `USER_LOCK_MAX_CAPACITY`.
#[must_use]
pub fn get_user_lock_max_capacity() -> u64 {
    std::env::var("USER_LOCK_MAX_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(USER_LOCK_MAX_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Tests run in one function to avoid environment variable race conditions
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        // 1. Standard loading with defaults for the optional fields
        env::set_var("TELEGRAM_TOKEN", "dummy_token");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.database_path, "fruitstand.db");
        assert_eq!(settings.responses_dir, "responses");

        // 2. Explicit overrides (upper-case env mapped to snake_case fields)
        env::set_var("DATABASE_PATH", "/tmp/greetings.db");
        env::set_var("RESPONSES_DIR", "/tmp/replies");

        let settings = Settings::new()?;
        assert_eq!(settings.database_path, "/tmp/greetings.db");
        assert_eq!(settings.responses_dir, "/tmp/replies");

        env::remove_var("DATABASE_PATH");
        env::remove_var("RESPONSES_DIR");

        // 3. Empty env var falls back to the default
        env::set_var("DATABASE_PATH", "");

        let settings = Settings::new()?;
        assert_eq!(settings.database_path, "fruitstand.db");

        env::remove_var("DATABASE_PATH");
        env::remove_var("TELEGRAM_TOKEN");
        Ok(())
    }

    #[test]
    fn test_lock_tuning_defaults() {
        assert_eq!(get_user_lock_ttl(), USER_LOCK_TTL_SECS);
        assert_eq!(get_user_lock_max_capacity(), USER_LOCK_MAX_CAPACITY);
    }
}
