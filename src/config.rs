//! Service configuration from environment variables
//!
//! - AIRWATCH_HOST: Bind address (default: 0.0.0.0)
//! - AIRWATCH_PORT: Port number (default: 8080)
//! - AIRWATCH_LAT / AIRWATCH_LON: Monitored coordinates (default: Jakarta)
//! - AIRWATCH_TIMEZONE: IANA timezone of the monitored location (default: Asia/Jakarta)
//! - AIRWATCH_RULES_FILE: Optional JSON seed of users and rules
//! - AIRWATCH_HTTP_TIMEOUT_SECS: Outbound HTTP timeout (default: 30)
//! - OPENWEATHER_API_KEY: Required
//! - OPENWEATHER_BASE_URL: Override for the air-pollution API
//! - EMAIL_API_KEY: Email API key; emails are skipped when unset
//! - EMAIL_FROM / EMAIL_API_URL: Sender address and API base URL

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::notify::http_email;
use crate::provider::{openweather, Coordinates};

pub const DEFAULT_LAT: f64 = -6.2088;
pub const DEFAULT_LON: f64 = 106.8456;
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
pub const DEFAULT_FROM: &str = "Air Alerts <alerts@airwatch.local>";

/// Email API settings; absent when no key is configured
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub location: Coordinates,
    pub timezone: Tz,
    pub openweather_base_url: String,
    pub openweather_api_key: String,
    pub email: Option<EmailConfig>,
    pub rules_file: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let host = var("AIRWATCH_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("AIRWATCH_PORT", var("AIRWATCH_PORT"), 8080u16)?;

        let lat = parse_or("AIRWATCH_LAT", var("AIRWATCH_LAT"), DEFAULT_LAT)?;
        let lon = parse_or("AIRWATCH_LON", var("AIRWATCH_LON"), DEFAULT_LON)?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ConfigError::Invalid {
                key: "AIRWATCH_LAT/AIRWATCH_LON",
                value: format!("{},{}", lat, lon),
            });
        }

        let timezone_name = var("AIRWATCH_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "AIRWATCH_TIMEZONE",
            value: timezone_name.clone(),
        })?;

        let openweather_api_key =
            var("OPENWEATHER_API_KEY").ok_or(ConfigError::Missing("OPENWEATHER_API_KEY"))?;
        let openweather_base_url = var("OPENWEATHER_BASE_URL")
            .unwrap_or_else(|| openweather::DEFAULT_BASE_URL.to_string());

        let email = var("EMAIL_API_KEY").map(|api_key| EmailConfig {
            api_url: var("EMAIL_API_URL").unwrap_or_else(|| http_email::DEFAULT_API_URL.to_string()),
            api_key,
            from: var("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
        });

        let http_timeout_secs =
            parse_or("AIRWATCH_HTTP_TIMEOUT_SECS", var("AIRWATCH_HTTP_TIMEOUT_SECS"), 30u64)?;

        Ok(Self {
            host,
            port,
            location: Coordinates::new(lat, lon),
            timezone,
            openweather_base_url,
            openweather_api_key,
            email,
            rules_file: var("AIRWATCH_RULES_FILE").map(PathBuf::from),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors, reported at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
