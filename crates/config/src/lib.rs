//! Configuration loading, validation, and management for Minebrain.
//!
//! Loads configuration from `~/.minebrain/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use minebrain_core::{ActionLimits, AuthMode, LoginOptions, Verb};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.minebrain/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Elevated visibility: the model sees the player roster and world info
    #[serde(default)]
    pub admin: bool,

    /// Game server to join
    #[serde(default)]
    pub server: ServerConfig,

    /// Game-side bridge process
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Chat command surface
    #[serde(default)]
    pub chat: ChatConfig,

    /// Completion endpoint
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Conversation window
    #[serde(default)]
    pub context: ContextConfig,

    /// Handler bounds and disabled verbs
    #[serde(default)]
    pub actions: ActionsConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub auth: AuthMode,
}

fn default_server_host() -> String {
    "localhost".into()
}
fn default_server_port() -> u16 {
    25565
}
fn default_username() -> String {
    "Minebrain".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            username: default_username(),
            auth: AuthMode::default(),
        }
    }
}

impl ServerConfig {
    pub fn login_options(&self) -> LoginOptions {
        LoginOptions {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            auth: self.auth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// `host:port` of the bridge's JSON-lines control socket
    #[serde(default = "default_bridge_address")]
    pub address: String,

    #[serde(default = "default_bridge_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bridge_address() -> String {
    "127.0.0.1:7878".into()
}
fn default_bridge_timeout() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: default_bridge_address(),
            request_timeout_secs: default_bridge_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chat lines starting with this are requests to the agent
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Said before each model call; empty disables it
    #[serde(default = "default_processing_notice")]
    pub processing_notice: String,

    /// Players allowed to issue requests; empty allows everyone
    #[serde(default)]
    pub operators: Vec<String>,

    /// Echo unparseable reply lines to chat
    #[serde(default = "default_true")]
    pub report_parse_errors: bool,

    /// Say handler failures in chat
    #[serde(default = "default_true")]
    pub report_failures: bool,
}

fn default_prefix() -> String {
    "!".into()
}
fn default_processing_notice() -> String {
    "Processing..".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            processing_notice: default_processing_notice(),
            operators: Vec::new(),
            report_parse_errors: true,
            report_failures: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Chat completions URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Sent as `model` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sent as a bearer token when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    /// Only the text after the last occurrence is acted on; empty disables
    #[serde(default = "default_reply_delimiter")]
    pub reply_delimiter: String,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:11434/v1/chat/completions".into()
}
fn default_inference_timeout() -> u64 {
    120
}
fn default_reply_delimiter() -> String {
    "$@$".into()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: None,
            api_key: None,
            timeout_secs: default_inference_timeout(),
            reply_delimiter: default_reply_delimiter(),
        }
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .field("reply_delimiter", &self.reply_delimiter)
            .finish()
    }
}

impl InferenceConfig {
    /// The delimiter rule, `None` when disabled.
    pub fn delimiter(&self) -> Option<&str> {
        (!self.reply_delimiter.is_empty()).then_some(self.reply_delimiter.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// History entries kept after the seed entry; 0 keeps everything
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    40
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default = "default_kill_interval_ms")]
    pub kill_interval_ms: u64,

    #[serde(default = "default_kill_max_attempts")]
    pub kill_max_attempts: u32,

    #[serde(default = "default_kill_max_duration_secs")]
    pub kill_max_duration_secs: u64,

    #[serde(default = "default_build_max_size")]
    pub build_max_size: u32,

    #[serde(default = "default_mine_reach")]
    pub mine_reach: f64,

    #[serde(default = "default_chest_radius")]
    pub chest_radius: f64,

    #[serde(default = "default_place_reach")]
    pub place_reach: i32,

    /// Verbs with no handler; the model is not told about them
    #[serde(default)]
    pub disabled: Vec<Verb>,
}

fn default_kill_interval_ms() -> u64 {
    500
}
fn default_kill_max_attempts() -> u32 {
    120
}
fn default_kill_max_duration_secs() -> u64 {
    60
}
fn default_build_max_size() -> u32 {
    16
}

/// Largest cube edge a config may allow BUILD to lay.
pub const BUILD_SIZE_CEILING: u32 = 64;
fn default_mine_reach() -> f64 {
    5.0
}
fn default_chest_radius() -> f64 {
    10.0
}
fn default_place_reach() -> i32 {
    2
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            kill_interval_ms: default_kill_interval_ms(),
            kill_max_attempts: default_kill_max_attempts(),
            kill_max_duration_secs: default_kill_max_duration_secs(),
            build_max_size: default_build_max_size(),
            mine_reach: default_mine_reach(),
            chest_radius: default_chest_radius(),
            place_reach: default_place_reach(),
            disabled: Vec::new(),
        }
    }
}

impl ActionsConfig {
    pub fn limits(&self) -> ActionLimits {
        ActionLimits {
            kill_interval: Duration::from_millis(self.kill_interval_ms),
            kill_max_attempts: self.kill_max_attempts,
            kill_max_duration: Duration::from_secs(self.kill_max_duration_secs),
            build_max_size: self.build_max_size,
            mine_reach: self.mine_reach,
            chest_radius: self.chest_radius,
            place_reach: self.place_reach,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.minebrain/config.toml).
    ///
    /// Environment variables override the file:
    /// - `MINEBRAIN_API_KEY`
    /// - `MINEBRAIN_ENDPOINT`
    /// - `MINEBRAIN_MODEL`
    /// - `MINEBRAIN_BRIDGE`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_path())
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("MINEBRAIN_API_KEY") {
            self.inference.api_key = Some(key);
        }
        if let Some(endpoint) = var("MINEBRAIN_ENDPOINT") {
            self.inference.endpoint = endpoint;
        }
        if let Some(model) = var("MINEBRAIN_MODEL") {
            self.inference.model = Some(model);
        }
        if let Some(address) = var("MINEBRAIN_BRIDGE") {
            self.bridge.address = address;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".minebrain")
    }

    /// Default config file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError("chat.prefix must not be empty".into()));
        }

        if self.server.username.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.username must not be empty".into(),
            ));
        }

        if !self.inference.endpoint.starts_with("http://")
            && !self.inference.endpoint.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "inference.endpoint must be an http(s) URL".into(),
            ));
        }

        if self.inference.timeout_secs == 0 || self.bridge.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("timeouts must be > 0".into()));
        }

        let actions = &self.actions;
        if actions.kill_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "actions.kill_interval_ms must be > 0".into(),
            ));
        }
        if actions.kill_max_attempts == 0 || actions.kill_max_duration_secs == 0 {
            return Err(ConfigError::ValidationError(
                "KILL needs a max attempt count and a max duration > 0".into(),
            ));
        }
        if actions.build_max_size == 0 || actions.build_max_size > BUILD_SIZE_CEILING {
            return Err(ConfigError::ValidationError(format!(
                "actions.build_max_size must be between 1 and {BUILD_SIZE_CEILING}"
            )));
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(actions.mine_reach) || !positive(actions.chest_radius) || actions.place_reach < 1 {
            return Err(ConfigError::ValidationError(
                "reach, chest radius and place reach must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin: false,
            server: ServerConfig::default(),
            bridge: BridgeConfig::default(),
            chat: ChatConfig::default(),
            inference: InferenceConfig::default(),
            context: ContextConfig::default(),
            actions: ActionsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
