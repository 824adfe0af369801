use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::analysis::{EstimatorConfig, SubscriptionPlan};

/// Environment variable prefix, e.g. `COST_ADVISOR__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "COST_ADVISOR";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub api_keys: Vec<ApiKeyConfig>,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
    /// Browser origins allowed to call the API; empty disables CORS
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    pub key: String,
    pub name: String,
    pub enabled: bool,
    /// Subscription plan applied to every analysis made with this key
    #[serde(default)]
    pub plan: SubscriptionPlan,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted request body, billing uploads included
    pub max_file_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Per-key analysis history
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// SQLite URL, e.g. `sqlite:./data/history.db` or `sqlite::memory:`
    pub database_url: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url: "sqlite:./data/history.db".to_string(),
        }
    }
}

/// Load `path` (extension optional), layer `COST_ADVISOR__*` overrides on
/// top and validate the result
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.host.parse::<std::net::IpAddr>().is_err() {
        anyhow::bail!("server.host '{}' is not a valid IP address", cfg.server.host);
    }

    match cfg.server.log_format.as_str() {
        "json" | "text" | "pretty" => {}
        other => anyhow::bail!("server.log_format must be json, text or pretty (got '{}')", other),
    }

    for origin in &cfg.server.cors_origins {
        if origin.parse::<axum::http::HeaderValue>().is_err() {
            anyhow::bail!("server.cors_origins contains an invalid origin: '{}'", origin);
        }
    }

    // Validate at least one API key is configured
    if cfg.api_keys.is_empty() {
        anyhow::bail!("At least one API key must be configured");
    }

    let mut seen = HashSet::new();
    for key in &cfg.api_keys {
        if key.name.is_empty() {
            anyhow::bail!("API key name cannot be empty");
        }
        if key.key.is_empty() {
            anyhow::bail!("API key '{}' has an empty key value", key.name);
        }
        if !seen.insert(key.key.as_str()) {
            anyhow::bail!("API key '{}' duplicates another configured key", key.name);
        }
    }

    if cfg.upload.max_file_bytes == 0 {
        anyhow::bail!("upload.max_file_bytes must be greater than 0");
    }

    if cfg.history.enabled && !cfg.history.database_url.starts_with("sqlite:") {
        anyhow::bail!(
            "history.database_url must be a sqlite: URL (got '{}')",
            cfg.history.database_url
        );
    }

    cfg.estimator.validate()?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            cors_origins: vec![],
        },
        api_keys: vec![
            ApiKeyConfig {
                key: "sk-starter-0001".to_string(),
                name: "starter-app".to_string(),
                enabled: true,
                plan: SubscriptionPlan::Starter,
            },
            ApiKeyConfig {
                key: "sk-enterprise-0002".to_string(),
                name: "enterprise-app".to_string(),
                enabled: true,
                plan: SubscriptionPlan::Enterprise,
            },
            ApiKeyConfig {
                key: "sk-disabled-0003".to_string(),
                name: "disabled-app".to_string(),
                enabled: false,
                plan: SubscriptionPlan::Professional,
            },
        ],
        estimator: EstimatorConfig::default(),
        upload: UploadConfig::default(),
        metrics: MetricsConfig::default(),
        history: HistoryConfig {
            enabled: false,
            ..HistoryConfig::default()
        },
    }
}
