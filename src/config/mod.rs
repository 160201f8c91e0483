//! Configuration management

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::dashboard::DashboardKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// REST base, e.g. http://localhost:8080
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// WebSocket base, e.g. ws://localhost:8080
    #[serde(default = "default_ws_base_url")]
    pub ws_base_url: String,

    /// Dashboard to open when no session role decides it
    #[serde(default)]
    pub dashboard: Option<DashboardKind>,

    /// Where session keys are persisted (defaults to the config dir)
    #[serde(default)]
    pub session_path: Option<PathBuf>,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub live: LiveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            ws_base_url: default_ws_base_url(),
            dashboard: None,
            session_path: None,
            http_timeout_secs: default_http_timeout_secs(),
            router: RouterConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl Config {
    /// Reject values that would stall or panic at runtime
    pub fn validate(&self) -> Result<()> {
        if self.live.health_check_interval_secs == 0 {
            bail!("live.health_check_interval_secs must be at least 1");
        }
        if self.live.max_reconnect_attempts == 0 {
            bail!("live.max_reconnect_attempts must be at least 1");
        }
        if self.router.max_retries > MAX_ROUTER_RETRIES {
            bail!(
                "router.max_retries must be at most {} (got {})",
                MAX_ROUTER_RETRIES,
                self.router.max_retries
            );
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| get_config_dir().join(SESSION_FILE))
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_ws_base_url() -> String {
    "ws://localhost:8080".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

const SESSION_FILE: &str = "session.json";

const MAX_ROUTER_RETRIES: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Overrides the dashboard's own landing page
    #[serde(default)]
    pub landing_page: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            landing_page: None,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_health_check_interval_secs() -> u64 {
    30
}

/// Platform config directory, falling back to the working directory
pub fn get_config_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "pos", "pos-dashboard")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let config = ::config::Config::builder()
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy())
                .required(false),
        )
        // Override with environment variables (POS_API_BASE_URL, POS_LIVE__RECONNECT_DELAY_MS, etc.)
        .add_source(
            ::config::Environment::with_prefix("POS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
