//! Runtime configuration: `~/.picoagent/config.json`, 0600 permissions,
//! overridable via `PICOAGENT_HOME`.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config field: {0}")]
    MissingRequired(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("environment variable error: {0}")]
    EnvError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub enabled: bool,
    #[serde(default)]
    pub allowlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Top-level runtime configuration, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: String,
    pub chat_model: String,
    pub embedding_model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_tool_chain")]
    pub max_tool_chain: usize,
    #[serde(default = "default_tool_timeout_seconds")]
    pub tool_timeout_seconds: u64,
    #[serde(default = "default_tool_cache_ttl_seconds")]
    pub tool_cache_ttl_seconds: u64,
    pub workspace_root: PathBuf,
    #[serde(default)]
    pub channels: HashMap<String, ChannelConfig>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
    #[serde(default)]
    pub allow_shell: bool,
    #[serde(default)]
    pub allow_file_tool: bool,
    #[serde(default = "default_true")]
    pub restrict_to_workspace: bool,
    #[serde(default)]
    pub shell_deny_patterns: Vec<String>,
}

fn default_max_tool_chain() -> usize {
    3
}

fn default_tool_timeout_seconds() -> u64 {
    30
}

fn default_tool_cache_ttl_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.is_empty() {
            return Err(ConfigError::MissingRequired("provider".to_string()));
        }
        if self.chat_model.is_empty() {
            return Err(ConfigError::MissingRequired("chat_model".to_string()));
        }
        if self.max_tool_chain == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tool_chain".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Resolve `~/.picoagent`, honoring a `PICOAGENT_HOME` override.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(override_path) = std::env::var("PICOAGENT_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".picoagent"))
        .ok_or_else(|| ConfigError::EnvError("could not determine home directory".to_string()))
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(home_dir()?.join("config.json"))
}

/// Load config from disk, validating it. Missing file is a `MissingRequired`
/// error — onboarding must create one first.
pub fn load() -> Result<Config, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        return Err(ConfigError::MissingRequired(format!(
            "config file not found at {}",
            path.display()
        )));
    }
    let file = File::open(&path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    let reader = BufReader::new(file);
    let config: Config =
        serde_json::from_reader(reader).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Persist `config` to `~/.picoagent/config.json` with 0600 permissions.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    config.validate()?;
    let path = config_path()?;
    write_restricted(&path, config)
}

fn write_restricted(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| ConfigError::IoError(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let json = serde_json::to_vec_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    file.write_all(&json).map_err(|e| ConfigError::IoError(e.to_string()))?;
    file.flush().map_err(|e| ConfigError::IoError(e.to_string()))?;
    Ok(())
}
