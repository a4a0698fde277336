//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend API configuration.
    pub api: ApiConfig,
    /// Synchronization (polling/pagination) configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dashboard backend, e.g. `https://shop.example.com`.
    pub base_url: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Synchronization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Interval between background refreshes of a mounted view.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Page size of the paginated notification list.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Number of items shown by the bell widget.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// JSON file holding `admin`/`user` bearer tokens.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    /// Admin bearer token. Preferred over the user token.
    #[serde(default)]
    pub admin_token: Option<String>,
    /// User bearer token.
    #[serde(default)]
    pub user_token: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("dashboard-notify/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_poll_interval_secs() -> u64 {
    30
}

const fn default_page_size() -> u32 {
    10
}

const fn default_recent_limit() -> u32 {
    5
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            page_size: default_page_size(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl ApiConfig {
    /// Config pointing at `base_url` with default timeouts.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    /// Total request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl SyncConfig {
    /// Poll interval as a [`Duration`]. Zero is bumped to one second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `DASHBOARD_ENV`)
    /// 3. Environment variables with `DASHBOARD_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("DASHBOARD_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
