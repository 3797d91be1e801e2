use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Per-network endpoint the Submission Router dispatches to. `passphrase`
/// is the reference chain's (stellar-style) network passphrase; left empty
/// for generic-RPC chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub endpoint: String,
    pub passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_jwt_validation: bool,
    pub enable_api_key_validation: bool,
    pub jwt_secret: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

/// Every tunable named in the finalization pipeline's configuration table,
/// plus the ambient sections (log level, data directory, admin auth,
/// ingress rate limiting) the teacher's `infrastructure::config::Config`
/// carries for a production actix-web service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: String,
    pub log_level: String,
    pub port: u16,
    pub data_dir: String,

    /// Finalizer Queue concurrency.
    pub parallel_tasks: usize,
    pub min_parallel_tasks: usize,
    pub max_parallel_tasks: usize,
    pub adaptive_concurrency: bool,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub metrics_interval_secs: u64,
    pub target_queue_size: usize,
    pub ticker_timeout_secs: u64,

    /// Submission Queue concurrency.
    pub submission_concurrency: usize,
    pub max_submission_concurrency: usize,
    pub submission_retry_attempts: u32,
    pub submission_retry_delay_ms: u64,

    pub networks: HashMap<String, NetworkConfig>,
    pub security: SecurityConfig,
    pub rate_limits: RateLimitConfig,
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            port: 4000,
            data_dir: "./data".to_string(),
            parallel_tasks: 2,
            min_parallel_tasks: 1,
            max_parallel_tasks: 8,
            adaptive_concurrency: true,
            retry_attempts: 3,
            retry_delay_ms: 500,
            metrics_interval_secs: 10,
            target_queue_size: 50,
            ticker_timeout_secs: 2,
            submission_concurrency: 2,
            max_submission_concurrency: 6,
            submission_retry_attempts: 5,
            submission_retry_delay_ms: 1000,
            networks: Self::default_networks(),
            security: SecurityConfig::default(),
            rate_limits: RateLimitConfig { window_ms: 60_000, max_requests: 600 },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let environment = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());

        let mut config = Self {
            environment: environment.clone(),
            log_level: Self::env_or("LOG_LEVEL", "info"),
            port: Self::env_parse("PORT", 4000)?,
            data_dir: Self::env_or("DATA_DIR", "./data"),
            parallel_tasks: Self::env_parse("PARALLEL_TASKS", 2)?,
            min_parallel_tasks: Self::env_parse("MIN_PARALLEL_TASKS", 1)?,
            max_parallel_tasks: Self::env_parse("MAX_PARALLEL_TASKS", 8)?,
            adaptive_concurrency: Self::env_or("ADAPTIVE_CONCURRENCY", "true") == "true",
            retry_attempts: Self::env_parse("RETRY_ATTEMPTS", 3)?,
            retry_delay_ms: Self::env_parse("RETRY_DELAY_MS", 500)?,
            metrics_interval_secs: Self::env_parse("METRICS_INTERVAL_SECS", 10)?,
            target_queue_size: Self::env_parse("TARGET_QUEUE_SIZE", 50)?,
            ticker_timeout_secs: Self::env_parse("TICKER_TIMEOUT_SECS", 2)?,
            submission_concurrency: Self::env_parse("SUBMISSION_CONCURRENCY", 2)?,
            max_submission_concurrency: Self::env_parse("MAX_SUBMISSION_CONCURRENCY", 6)?,
            submission_retry_attempts: Self::env_parse("SUBMISSION_RETRY_ATTEMPTS", 5)?,
            submission_retry_delay_ms: Self::env_parse("SUBMISSION_RETRY_DELAY_MS", 1000)?,
            networks: Self::default_networks(),
            security: SecurityConfig {
                enable_jwt_validation: Self::env_or("ENABLE_JWT_VALIDATION", "true") == "true",
                enable_api_key_validation: Self::env_or("ENABLE_API_KEY_VALIDATION", "true") == "true",
                jwt_secret: Self::env_or("JWT_SECRET", "dev_jwt_secret"),
                api_key: Self::env_or("API_KEY", "dev_api_key"),
            },
            rate_limits: RateLimitConfig {
                window_ms: Self::env_parse("RATE_LIMIT_WINDOW_MS", 60_000)?,
                max_requests: Self::env_parse("RATE_LIMIT_MAX", 600)?,
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        if let Ok(endpoint) = env::var("STELLAR_HORIZON_URL") {
            config.networks.insert(
                "testnet".to_string(),
                NetworkConfig {
                    endpoint,
                    passphrase: Self::env_or(
                        "STELLAR_NETWORK_PASSPHRASE",
                        "Test SDF Network ; September 2015",
                    ),
                },
            );
        }
        if let Ok(endpoint) = env::var("ETHEREUM_RPC_URL") {
            config.networks.insert("ethereum".to_string(), NetworkConfig { endpoint, passphrase: String::new() });
        }

        config.validate()?;
        Ok(config)
    }

    fn env_or(key: &str, fallback: &str) -> String {
        env::var(key).unwrap_or_else(|_| fallback.to_string())
    }

    fn env_parse<T: FromStr>(key: &str, fallback: T) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        match env::var(key) {
            Ok(v) if !v.is_empty() => v
                .parse::<T>()
                .map_err(|e| anyhow!("invalid value for {key}: {e}")),
            _ => Ok(fallback),
        }
    }

    fn default_networks() -> HashMap<String, NetworkConfig> {
        let mut networks = HashMap::new();
        networks.insert(
            "testnet".to_string(),
            NetworkConfig {
                endpoint: "https://horizon-testnet.stellar.org".to_string(),
                passphrase: "Test SDF Network ; September 2015".to_string(),
            },
        );
        networks
    }

    fn validate(&self) -> Result<()> {
        if self.min_parallel_tasks == 0 {
            return Err(anyhow!("MIN_PARALLEL_TASKS must be at least 1"));
        }
        if self.min_parallel_tasks > self.max_parallel_tasks {
            return Err(anyhow!("MIN_PARALLEL_TASKS cannot exceed MAX_PARALLEL_TASKS"));
        }
        if self.submission_concurrency > self.max_submission_concurrency {
            return Err(anyhow!("SUBMISSION_CONCURRENCY cannot exceed MAX_SUBMISSION_CONCURRENCY"));
        }
        if self.networks.is_empty() {
            return Err(anyhow!("at least one network must be configured"));
        }
        if self.environment == "production" {
            if self.security.jwt_secret.is_empty() && self.security.enable_jwt_validation {
                return Err(anyhow!("JWT_SECRET is required in production when JWT validation is enabled"));
            }
            if self.security.api_key.is_empty() && self.security.enable_api_key_validation {
                return Err(anyhow!("API_KEY is required in production when API key validation is enabled"));
            }
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn submission_retry_delay(&self) -> Duration {
        Duration::from_millis(self.submission_retry_delay_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }

    pub fn ticker_timeout(&self) -> Duration {
        Duration::from_secs(self.ticker_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().expect("default config must be valid");
    }

    #[test]
    fn min_exceeding_max_is_rejected() {
        let mut config = Config::default();
        config.min_parallel_tasks = 10;
        config.max_parallel_tasks = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_networks_is_rejected() {
        let mut config = Config::default();
        config.networks.clear();
        assert!(config.validate().is_err());
    }
}
