// src/config/mod.rs
//! Runtime configuration: server settings from TOML + env, secrets from env.

pub mod credentials;

pub use credentials::{Credentials, HookSecrets};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "CONNECTOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/connector.toml";

/// A value a request path needs but the environment does not provide.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_tracker_ttl_secs() -> u64 {
    5 * 3600
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_shutdown_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// How long a relayed fingerprint suppresses repeats.
    #[serde(default = "default_tracker_ttl_secs")]
    pub tracker_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            metrics_port: default_metrics_port(),
            tracker_ttl_secs: default_tracker_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    pub fn tracker_ttl(&self) -> Duration {
        Duration::from_secs(self.tracker_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Parse a TOML document; missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing connector config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading connector config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $CONNECTOR_CONFIG_PATH (must exist)
    /// 2) config/connector.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<u16>("PORT")? {
            self.port = v;
        }
        if let Some(v) = env_parse::<u16>("METRICS_PORT")? {
            self.metrics_port = v;
        }
        if let Some(v) = env_parse::<u64>("TRACKER_EXPIRY_SECS")? {
            self.tracker_ttl_secs = v;
        }
        if let Some(v) = env_parse::<u64>("REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("SHUTDOWN_TIMEOUT_SECS")? {
            self.shutdown_timeout_secs = v;
        }
        if let Some(v) = env_nonempty("LOG_LEVEL") {
            self.log_level = v.to_ascii_lowercase();
        }
        if let Some(v) = env_nonempty("LOG_FORMAT") {
            self.log_format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => return Err(anyhow!("unsupported LOG_FORMAT: {other}")),
            };
        }
        Ok(())
    }
}

pub(crate) fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_nonempty(key)
        .map(|v| v.parse::<T>().with_context(|| format!("parsing {key}={v}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = ServerConfig::from_toml_str("port = 3000\nlog_format = \"json\"").unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.metrics_port, 9090);
        assert_eq!(cfg.tracker_ttl(), Duration::from_secs(18_000));
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn empty_toml_equals_default() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(ServerConfig::from_toml_str("port = \"eighty\"").is_err());
    }
}
