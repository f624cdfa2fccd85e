use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROVIDER_API_URL: &str = "https://translation.googleapis.com";

/// Daily at 00:00 UTC (sec min hour day month weekday)
pub const DEFAULT_CATALOG_REFRESH_CRON: &str = "0 0 0 * * *";

/// Sundays at 01:00 UTC
pub const DEFAULT_CACHE_RESET_CRON: &str = "0 0 1 * * Sun";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,

    // HTTP server
    pub port: u16,

    // Database
    pub database_url: String,

    // Translation provider
    pub provider_api_key: String,
    pub provider_api_url: String,
    pub provider_timeout_secs: u64,
    pub display_language: String,

    // Catalog & cache maintenance
    pub catalog_max_age_hours: u64,
    pub catalog_refresh_cron: String,
    pub cache_reset_cron: String,

    // Admin endpoints (disabled when unset)
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            port: env_parse_or("PORT", 8080),

            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://translate.db".to_string()),

            provider_api_key: std::env::var("GOOGLE_TRANSLATE_API_KEY")
                .context("GOOGLE_TRANSLATE_API_KEY not set")?,
            provider_api_url: std::env::var("GOOGLE_TRANSLATE_API_URL")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_API_URL.to_string()),
            provider_timeout_secs: env_parse_or("PROVIDER_TIMEOUT_SECS", 10),
            display_language: std::env::var("LANGUAGE_DISPLAY_TAG")
                .unwrap_or_else(|_| "en".to_string()),

            catalog_max_age_hours: env_parse_or("CATALOG_MAX_AGE_HOURS", 24),
            catalog_refresh_cron: std::env::var("CATALOG_REFRESH_CRON")
                .unwrap_or_else(|_| DEFAULT_CATALOG_REFRESH_CRON.to_string()),
            cache_reset_cron: std::env::var("CACHE_RESET_CRON")
                .unwrap_or_else(|_| DEFAULT_CACHE_RESET_CRON.to_string()),

            api_key: std::env::var("API_KEY").ok().filter(|key| !key.is_empty()),
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn catalog_max_age(&self) -> Duration {
        Duration::from_secs(self.catalog_max_age_hours.saturating_mul(3600))
    }
}

/// Parse an environment variable, falling back to `default` if unset or invalid
fn env_parse_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ENVIRONMENT",
        "PORT",
        "DATABASE_URL",
        "GOOGLE_TRANSLATE_API_KEY",
        "GOOGLE_TRANSLATE_API_URL",
        "PROVIDER_TIMEOUT_SECS",
        "LANGUAGE_DISPLAY_TAG",
        "CATALOG_MAX_AGE_HOURS",
        "CATALOG_REFRESH_CRON",
        "CACHE_RESET_CRON",
        "API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_provider_key() {
        clear_env();

        let result = Config::from_env();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("GOOGLE_TRANSLATE_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");

        let config = Config::from_env().expect("Should load config");

        assert_eq!(config.environment, "development");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite://translate.db");
        assert_eq!(config.provider_api_key, "test-key");
        assert_eq!(config.provider_api_url, DEFAULT_PROVIDER_API_URL);
        assert_eq!(config.provider_timeout(), Duration::from_secs(10));
        assert_eq!(config.display_language, "en");
        assert_eq!(config.catalog_max_age(), Duration::from_secs(24 * 3600));
        assert_eq!(config.catalog_refresh_cron, DEFAULT_CATALOG_REFRESH_CRON);
        assert_eq!(config.cache_reset_cron, DEFAULT_CACHE_RESET_CRON);
        assert!(config.api_key.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");
        std::env::set_var("PORT", "9090");
        std::env::set_var("PROVIDER_TIMEOUT_SECS", "3");
        std::env::set_var("CATALOG_MAX_AGE_HOURS", "1");
        std::env::set_var("API_KEY", "admin-secret");

        let config = Config::from_env().expect("Should load config");

        assert_eq!(config.port, 9090);
        assert_eq!(config.provider_timeout(), Duration::from_secs(3));
        assert_eq!(config.catalog_max_age(), Duration::from_secs(3600));
        assert_eq!(config.api_key.as_deref(), Some("admin-secret"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back_to_defaults() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("PROVIDER_TIMEOUT_SECS", "-5");

        let config = Config::from_env().expect("Should load config");

        assert_eq!(config.port, 8080);
        assert_eq!(config.provider_timeout_secs, 10);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_huge_catalog_max_age_saturates() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");
        std::env::set_var("CATALOG_MAX_AGE_HOURS", u64::MAX.to_string());

        let config = Config::from_env().expect("Should load config");

        assert_eq!(config.catalog_max_age(), Duration::from_secs(u64::MAX));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_empty_api_key_disables_admin() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");
        std::env::set_var("API_KEY", "");

        let config = Config::from_env().expect("Should load config");
        assert!(config.api_key.is_none());

        clear_env();
    }
}
