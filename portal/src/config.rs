use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config/portal.yaml";
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_applications_limit")]
    pub applications_limit: usize,
    /// Unset means requests wait for the backend indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            top_k: default_top_k(),
            applications_limit: default_applications_limit(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub refetch_on_focus: bool,
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refetch_on_focus: false,
            retry: default_retry(),
            stale_time_secs: default_stale_time_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    /// Allow panels to substitute locally generated data when the backend fails.
    #[serde(default = "default_true")]
    pub synthetic_data: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            synthetic_data: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_top_k() -> usize {
    50
}

fn default_applications_limit() -> usize {
    50
}

fn default_retry() -> u32 {
    1
}

fn default_stale_time_secs() -> u64 {
    5 * 60
}

fn default_idle_timeout_secs() -> u64 {
    30 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

pub async fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let mut config = load_config_from(&path).await?;
    if let Some(base) = env::var("PORTAL_API_BASE")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        info!(base_url = %base, "Backend base URL overridden from environment");
        config.api.base_url = base;
    }
    Ok(config)
}

pub async fn load_config_from(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: AppConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    info!(path = %path.display(), "Configuration loaded from disk");
    Ok(config)
}

fn config_path() -> PathBuf {
    env::var("APP_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
