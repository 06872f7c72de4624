//! Integration test: Configuration utilities
//!
//! Tests the bin_common configuration loading functionality.

use ifunny_bot::bin_common::{load_client_config, load_config_from_env, ConfigType};
use ifunny_bot::chatsockets::ReconnectPolicy;
use std::env;
use std::io::Write;

#[test]
fn test_config_path_default_and_env() {
    // Both cases share the env var, so they run in one test
    env::remove_var("IFUNNY_CONFIG_PATH");
    let config_path = load_config_from_env(ConfigType::Client);
    assert_eq!(config_path.to_str().unwrap(), "config.yaml");

    env::set_var("IFUNNY_CONFIG_PATH", "conf/bot.yaml");
    let config_path = load_config_from_env(ConfigType::Client);
    assert_eq!(config_path.to_str().unwrap(), "conf/bot.yaml");
    env::remove_var("IFUNNY_CONFIG_PATH");
}

#[test]
fn test_custom_config() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let config_path = load_config_from_env(custom);

    assert_eq!(config_path.to_str().unwrap(), "custom/path.yaml");
}

#[test]
fn test_config_type_env_var_names() {
    assert_eq!(ConfigType::Client.env_var_name(), "IFUNNY_CONFIG_PATH");
}

#[test]
fn test_load_custom_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"
paginated_size: 50
prefixes: ["/", "!"]
auth_retry_delay_secs: 3
reconnect:
  kind: fixed
  delay_ms: 500
  max_attempts: 4
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = load_client_config(ConfigType::Custom(path)).unwrap();

    assert_eq!(config.paginated_size, 50);
    assert_eq!(config.prefixes, vec!["/", "!"]);
    assert_eq!(config.auth_retry_delay_secs, 3);
    assert_eq!(
        config.reconnect,
        ReconnectPolicy::Fixed {
            delay_ms: 500,
            max_attempts: Some(4)
        }
    );
    // unspecified fields keep their defaults
    assert_eq!(config.sendbird_user_agent, "jand/3.096");
}

#[test]
fn test_invalid_custom_yaml_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "paginated_size: 0").unwrap();

    let path = file.path().to_str().unwrap().to_string();
    assert!(load_client_config(ConfigType::Custom(path)).is_err());
}
