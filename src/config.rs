//! Configuration management for PDFToolkit Server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cleanup: CleanupConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub max_file_age_minutes: u64,
}

/// Largest minute count that still fits a `Duration` in whole seconds
pub const MAX_MINUTES: u64 = u64::MAX / 60;

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        minutes(self.interval_minutes)
    }

    pub fn max_age(&self) -> Duration {
        minutes(self.max_file_age_minutes)
    }
}

fn minutes(count: u64) -> Duration {
    count
        .checked_mul(60)
        .map(Duration::from_secs)
        .unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub api_key: Option<String>,
    pub admin_api_key: Option<String>,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests: usize,
    pub window_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_name: "PDFToolkit API".to_string(),
            environment: "dev".to_string(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: 100 * 1024 * 1024,
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from("uploads"),
                output_dir: PathBuf::from("output"),
            },
            cleanup: CleanupConfig {
                enabled: true,
                interval_minutes: 1440,
                max_file_age_minutes: 2880,
            },
            security: SecurityConfig {
                api_key: None,
                admin_api_key: None,
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            rate_limit: RateLimitConfig {
                requests: 100,
                window_secs: 3600,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            app_name: defaults.app_name,
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes)?,
            },
            storage: StorageConfig {
                uploads_dir: env::var("UPLOADS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.uploads_dir),
                output_dir: env::var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
            },
            cleanup: CleanupConfig {
                enabled: parse_var("CLEANUP_ENABLED", defaults.cleanup.enabled)?,
                interval_minutes: minutes_var(
                    "CLEANUP_INTERVAL_MINUTES",
                    defaults.cleanup.interval_minutes,
                    1,
                )?,
                max_file_age_minutes: minutes_var(
                    "MAX_FILE_AGE_MINUTES",
                    defaults.cleanup.max_file_age_minutes,
                    0,
                )?,
            },
            security: SecurityConfig {
                api_key: non_empty_var("API_KEY"),
                admin_api_key: non_empty_var("ADMIN_API_KEY"),
                allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|v| parse_origins(&v))
                    .unwrap_or(defaults.security.allowed_origins),
            },
            rate_limit: RateLimitConfig {
                requests: parse_var("RATE_LIMIT_REQUESTS", defaults.rate_limit.requests)?,
                window_secs: parse_var("RATE_LIMIT_WINDOW", defaults.rate_limit.window_secs)?,
            },
        })
    }

    pub fn is_dev(&self) -> bool {
        self.environment == "dev"
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

fn minutes_var(name: &'static str, default: u64, min: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_minutes(name, &value, min),
        Err(_) => Ok(default),
    }
}

/// Parse a minute count in `min..=MAX_MINUTES`
pub fn parse_minutes(name: &'static str, raw: &str, min: u64) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(count) if (min..=MAX_MINUTES).contains(&count) => Ok(count),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
