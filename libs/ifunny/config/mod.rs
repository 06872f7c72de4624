use chatsockets::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "IFUNNY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub const EMAIL_ENV: &str = "IFUNNY_EMAIL";
pub const PASSWORD_ENV: &str = "IFUNNY_PASSWORD";

/// Largest page size the backend accepts
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Client configuration
///
/// Every field has a default matching the official Android app, so an empty
/// YAML file is a valid config. Credentials never live in YAML; they come
/// from `IFUNNY_EMAIL` / `IFUNNY_PASSWORD` (a `.env` file is honoured).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// iFunny REST base
    pub api_base: String,
    /// Sendbird REST base
    pub sendbird_api_base: String,
    /// Sendbird WebSocket base
    pub sendbird_ws_base: String,
    pub sendbird_app_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub sendbird_user_agent: String,

    /// Items requested per page by resource paginators
    pub paginated_size: usize,

    /// Prefixes that mark a chat message as a command
    pub prefixes: Vec<String>,

    /// Token cache file (`~/.ifunnypy/config.json` when unset)
    pub token_cache_path: Option<PathBuf>,

    /// Delay before the single retry of a password grant answered with 403
    pub auth_retry_delay_secs: u64,

    pub request_timeout_secs: u64,

    /// How long `wait_for_chat` callers should wait for the handshake
    pub handshake_timeout_secs: u64,

    pub reconnect: ReconnectPolicy,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,

    #[serde(skip)]
    pub email: Option<String>,

    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.ifunny.mobi/v4".to_string(),
            sendbird_api_base: "https://api-us-1.sendbird.com/v3".to_string(),
            sendbird_ws_base: "wss://ws-us-1.sendbird.com".to_string(),
            sendbird_app_id: "AFB3A55B-8275-4C1E-AEA8-309842798187".to_string(),
            client_id: "MsOIJ39Q28".to_string(),
            client_secret: "PTDc3H8a)Vi=UYap".to_string(),
            user_agent: "iFunny/5.38.1(1117733) Android/9 (OnePlus; ONEPLUS A6013; OnePlus)"
                .to_string(),
            sendbird_user_agent: "jand/3.096".to_string(),
            paginated_size: 25,
            prefixes: vec!["/".to_string()],
            token_cache_path: None,
            auth_retry_delay_secs: 10,
            request_timeout_secs: 30,
            handshake_timeout_secs: 15,
            reconnect: ReconnectPolicy::default(),
            log_level: default_log_level(),
            email: None,
            password: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ClientConfig {
    /// Load configuration from a YAML file plus environment credentials
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from the path in `IFUNNY_CONFIG_PATH` (default `config.yaml`)
    ///
    /// A missing file yields the defaults; a present but invalid one is an
    /// error.
    pub fn from_env() -> Result<Self> {
        let path = config_path_from_env();
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Self::load(path);
        }

        info!("No config file at {:?}, using defaults", path);
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn apply_env(&mut self) {
        dotenv::dotenv().ok();

        if let Ok(email) = std::env::var(EMAIL_ENV) {
            self.email = Some(email);
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.password = Some(password);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api_base.is_empty() || self.sendbird_api_base.is_empty() {
            return Err(ConfigError::ValidationError(
                "api_base and sendbird_api_base must be set".to_string(),
            ));
        }

        if self.paginated_size == 0 || self.paginated_size > MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "paginated_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.prefixes.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one command prefix is required".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Email and password from the environment
    pub fn credentials(&self) -> Result<(String, String)> {
        let email = self
            .email
            .clone()
            .ok_or_else(|| ConfigError::EnvVarMissing(EMAIL_ENV.to_string()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| ConfigError::EnvVarMissing(PASSWORD_ENV.to_string()))?;
        Ok((email, password))
    }

    pub fn auth_retry_delay(&self) -> Duration {
        Duration::from_secs(self.auth_retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  API: {}", self.api_base);
        info!("  Sendbird API: {}", self.sendbird_api_base);
        info!("  Sendbird socket: {}", self.sendbird_ws_base);
        info!("  Page size: {}", self.paginated_size);
        info!("  Command prefixes: {:?}", self.prefixes);
        info!("  Reconnect: {:?}", self.reconnect);
        info!("  Log level: {}", self.log_level);
    }
}

/// Config file path from `IFUNNY_CONFIG_PATH` or the default
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
        .into()
}
