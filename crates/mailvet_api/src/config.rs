//! Configuration management for the validation API
//!
//! Defaults, then an optional `Config.toml`, then `MAILVET_` environment
//! variables (`__` separates nested keys, e.g. `MAILVET_SERVER__PORT`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "Config.toml";
pub const ENV_PREFIX: &str = "MAILVET_";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub validation: ValidationConfig,
    pub result_cache: ResultCacheConfig,
    pub observability: ObservabilityConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Load from defaults, `Config.toml` (if present) and the environment
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment(Path::new(CONFIG_FILE)).extract()
    }

    fn figment(config_file: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if config_file.exists() {
            figment = figment.merge(Toml::file(config_file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Engine configuration derived from the `validation` and `security` sections
    pub fn core_config(&self) -> mailvet_core::ValidationConfig {
        mailvet_core::ValidationConfig {
            dns_timeout_ms: self.validation.dns_timeout_ms,
            dns_attempts: self.validation.dns_attempts,
            dns_cache_size: self.validation.dns_cache_size,
            dns_min_ttl_secs: self.validation.dns_min_ttl_secs,
            bulk_concurrency: self.validation.bulk_concurrency,
            enable_auth_checks: self.validation.enable_auth_checks,
            fuzzy_typo_detection: self.validation.fuzzy_typo_detection,
            privacy_salt: self.security.privacy_salt.clone(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Validation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// DNS resolver timeout in milliseconds
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts
    pub dns_attempts: usize,
    /// DNS cache size (number of entries)
    pub dns_cache_size: usize,
    /// Minimum TTL for positive DNS cache entries in seconds
    pub dns_min_ttl_secs: u64,
    /// Domains resolved concurrently per batch chunk
    pub bulk_concurrency: usize,
    /// Look up SPF and DMARC records
    pub enable_auth_checks: bool,
    /// Edit-distance typo matching after the explicit typo map
    pub fuzzy_typo_detection: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let core = mailvet_core::ValidationConfig::default();
        Self {
            dns_timeout_ms: core.dns_timeout_ms,
            dns_attempts: core.dns_attempts,
            dns_cache_size: core.dns_cache_size,
            dns_min_ttl_secs: core.dns_min_ttl_secs,
            bulk_concurrency: core.bulk_concurrency,
            enable_auth_checks: core.enable_auth_checks,
            fuzzy_typo_detection: core.fuzzy_typo_detection,
        }
    }
}

/// Per-owner outcome store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCacheConfig {
    /// Maximum stored outcomes before the oldest are evicted
    pub max_entries: usize,
    /// Seconds a stored outcome stays usable
    pub ttl_secs: u64,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: mailvet_core::cache::DEFAULT_MAX_ENTRIES,
            ttl_secs: mailvet_core::cache::DEFAULT_TTL.as_secs(),
        }
    }
}

impl ResultCacheConfig {
    pub fn build(&self) -> mailvet_core::MemoryResultCache {
        mailvet_core::MemoryResultCache::new(self.max_entries, Duration::from_secs(self.ttl_secs))
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging
    pub json_logs: bool,
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "mailvet_api=debug,mailvet_core=debug".to_string(),
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes
    pub max_body_size_bytes: usize,
    /// Maximum number of addresses in one batch request
    pub max_batch_size: usize,
    /// Allowed CORS origins (empty = allow all)
    pub cors_origins: Vec<String>,
    /// Salt for redacting addresses in logs
    pub privacy_salt: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size_bytes: 8 * 1024 * 1024,
            max_batch_size: 50_000,
            cors_origins: Vec::new(),
            privacy_salt: None,
        }
    }
}
