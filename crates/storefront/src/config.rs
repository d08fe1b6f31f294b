//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Storefront configuration with sensible defaults.
///
/// Reads from environment variables (a `.env` file is honoured):
/// - `DATABASE_URL`: SQLite URL (default: `"sqlite://storefront.db?mode=rwc"`)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `SEED_ON_START`: fill empty tables with demo data (default: `true`)
/// - `CART_HOLD_TTL_SECS`: idle time before a cart's holds lapse (default: `1800`)
/// - `HOLD_SWEEP_INTERVAL_SECS`: how often lapsed holds are swept (default: `60`)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`: password hashing cost (default: `19456`, `2`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub seed_on_start: bool,
    pub cart_hold_ttl: Duration,
    pub hold_sweep_interval: Duration,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub log_level: String,
    pub log_format: LogFormat,
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            seed_on_start: parse_or(&lookup, "SEED_ON_START", defaults.seed_on_start)?,
            cart_hold_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CART_HOLD_TTL_SECS",
                defaults.cart_hold_ttl.as_secs(),
            )?),
            hold_sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "HOLD_SWEEP_INTERVAL_SECS",
                defaults.hold_sweep_interval.as_secs(),
            )?),
            argon2_memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", defaults.argon2_memory_kib)?,
            argon2_iterations: parse_or(&lookup, "ARGON2_ITERATIONS", defaults.argon2_iterations)?,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://storefront.db?mode=rwc".to_string(),
            database_max_connections: 5,
            seed_on_start: true,
            cart_hold_ttl: Duration::from_secs(1800),
            hold_sweep_interval: Duration::from_secs(60),
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
