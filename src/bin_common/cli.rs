//! CLI utilities for binaries
//!
//! Handles configuration loading and environment variables
//! for all binary executables.

use ifunny::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use ifunny::ClientConfig;
use std::path::PathBuf;
use tracing::info;

/// Where to load the client configuration from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigType {
    /// Client configuration (`IFUNNY_CONFIG_PATH`, default `config.yaml`)
    Client,
    /// Explicit path, e.g. from the command line
    Custom(String),
}

impl ConfigType {
    /// First CLI argument as a custom path, otherwise the client default
    pub fn from_args(args: &[String]) -> Self {
        match args.first() {
            Some(path) => ConfigType::Custom(path.clone()),
            None => ConfigType::Client,
        }
    }

    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Client => DEFAULT_CONFIG_PATH,
            ConfigType::Custom(path) => path,
        }
    }

    pub fn env_var_name(&self) -> &str {
        CONFIG_PATH_ENV
    }
}

/// Load configuration path from environment or use default
///
/// A custom path always wins over the environment.
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return path.into();
    }

    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Load the client configuration for a binary
///
/// A missing default file falls back to built-in defaults; a missing custom
/// file is an error.
pub fn load_client_config(config_type: ConfigType) -> anyhow::Result<ClientConfig> {
    let config = match &config_type {
        ConfigType::Custom(_) => {
            let path = load_config_from_env(config_type);
            info!("Loading configuration from {:?}", path);
            ClientConfig::load(&path)?
        }
        ConfigType::Client => ClientConfig::from_env()?,
    };
    Ok(config)
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_type_paths() {
        assert_eq!(ConfigType::Client.default_path(), "config.yaml");
        assert_eq!(ConfigType::Custom("bot.yaml".into()).default_path(), "bot.yaml");
    }

    #[test]
    fn test_from_args() {
        assert_eq!(ConfigType::from_args(&[]), ConfigType::Client);
        assert_eq!(
            ConfigType::from_args(&["my.yaml".to_string(), "extra".to_string()]),
            ConfigType::Custom("my.yaml".to_string())
        );
    }

    #[test]
    fn test_missing_custom_file_is_an_error() {
        let result = load_client_config(ConfigType::Custom("/nonexistent/ifunny.yaml".into()));
        assert!(result.is_err());
    }
}
