pub mod config_cmd;
pub mod init;
pub mod offline;
pub mod parse;
pub mod run;

use minebrain_config::AppConfig;
use std::path::PathBuf;

/// The config file in effect: `--config` if given, else the default path.
pub fn config_file(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(AppConfig::config_path)
}

/// Load, apply env overrides, validate.
pub fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_file(explicit);
    AppConfig::load_with_overrides(&path)
        .map_err(|e| format!("Failed to load config: {e}").into())
}
