//! Configuration management for Postdeck

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub posts: PostsConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub metricool: MetricoolConfig,
    #[serde(default)]
    pub linkedin: LinkedInConfig,
    #[serde(default)]
    pub compose: Option<ComposeConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Json,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostsConfig {
    /// Reject posts without Metricool channel ids
    #[serde(default)]
    pub require_channels: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_target")]
    pub default_target: String,
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            default_target: default_target(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricoolConfig {
    #[serde(default = "default_metricool_url")]
    pub base_url: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Credential name holding the API key
    #[serde(default = "default_metricool_key")]
    pub api_key_name: String,
}

impl Default for MetricoolConfig {
    fn default() -> Self {
        Self {
            base_url: default_metricool_url(),
            workspace_id: None,
            api_key_name: default_metricool_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: String,
    #[serde(default = "default_linkedin_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_linkedin_max_media")]
    pub max_media: usize,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            outbox_dir: default_outbox_dir(),
            max_chars: default_linkedin_max_chars(),
            max_media: default_linkedin_max_media(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    #[serde(default = "default_compose_endpoint")]
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_compose_key")]
    pub api_key_name: String,
    #[serde(default = "default_compose_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: CredentialBackend,
    /// Names-only list of stored keys
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            registry_path: default_registry_path(),
        }
    }
}

fn default_storage_path() -> String {
    "~/.local/share/postdeck/posts.db".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_target() -> String {
    "metricool".to_string()
}

fn default_metricool_url() -> String {
    "https://api.metricool.com".to_string()
}

fn default_metricool_key() -> String {
    "metricool".to_string()
}

fn default_outbox_dir() -> String {
    "~/.local/share/postdeck/outbox".to_string()
}

fn default_linkedin_max_chars() -> usize {
    3000
}

fn default_linkedin_max_media() -> usize {
    9
}

fn default_compose_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_compose_key() -> String {
    "compose".to_string()
}

fn default_compose_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_registry_path() -> String {
    "~/.config/postdeck/keys.toml".to_string()
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the built-in defaults; `POSTDECK_DB_PATH`
    /// overrides the storage path either way.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        if let Ok(db_path) = std::env::var("POSTDECK_DB_PATH") {
            config.storage.path = db_path;
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// A configuration backed entirely by memory, for tests and demos
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.storage.backend = StorageBackend::Memory;
        config.credentials.backend = CredentialBackend::Memory;
        config
    }
}

/// Expand `~` in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("POSTDECK_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("postdeck").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("postdeck"))
}
