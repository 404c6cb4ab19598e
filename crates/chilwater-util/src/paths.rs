//! Default paths for chilwater components

use std::path::PathBuf;

/// Environment variable for overriding the configuration file path
pub const CHILWATER_CONFIG_ENV: &str = "CHILWATER_CONFIG";

/// Base directory of the device configuration
pub const BASE_CONF_DIR: &str = "/var/lib/chilwater/conf";

/// Configuration filename within the configuration directory
const CONFIG_FILENAME: &str = "chilwater.toml";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$CHILWATER_CONFIG` environment variable (if set)
/// 2. `/var/lib/chilwater/conf/chilwater.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CHILWATER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the configuration path without checking the environment override.
pub fn config_path_without_env() -> PathBuf {
    PathBuf::from(BASE_CONF_DIR).join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_lives_in_conf_dir() {
        let path = config_path_without_env();
        assert!(path.starts_with(BASE_CONF_DIR));
        assert!(path.to_string_lossy().ends_with("chilwater.toml"));
    }
}
