use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::provider;
use crate::paths;

/// Application configuration, loaded from config.toml.
///
/// Every section uses `#[serde(default)]`, so the file is optional and any
/// field left out falls back to the value in the `Default` impl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind: String,
    /// Largest accepted request body (multipart or JSON), in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model ids tried in order until one starts streaming.
    pub candidates: Vec<String>,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; defaults to `<data_dir>/quickpick.db`.
    pub db_path: Option<PathBuf>,
    /// Upper bound on the background scan write.
    pub write_timeout_secs: u64,
    /// Store the first image's data URI instead of the placeholder token.
    pub store_images: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the authenticated user id, set by the auth proxy.
    pub user_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            candidates: provider::default_candidates(),
            max_output_tokens: 500,
            temperature: 0.7,
            base_url: provider::DEFAULT_BASE_URL.into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            write_timeout_secs: 10,
            store_images: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_header: "x-user-id".into(),
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(paths::db_path)
    }
}

/// Load the config from `path`, or from the default location when `None`.
/// A missing file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(paths::config_file);

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
