use crate::paths::AppPaths;
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const SERVER_URL_ENV_VAR: &str = "DOWNLOADER_WEB_SERVER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Timeout for info and settings calls.
    #[serde(default = "default_info_timeout_secs")]
    pub info_timeout_secs: u64,
    /// Timeout for single and bulk downloads, which block until done.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_toast_capacity")]
    pub toast_capacity: usize,
    #[serde(default = "default_toast_ttl_ms")]
    pub toast_ttl_ms: u64,
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,
    #[serde(default)]
    pub default_output_template: Option<String>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_info_timeout_secs() -> u64 {
    60
}
fn default_download_timeout_secs() -> u64 {
    3600
}
fn default_toast_capacity() -> usize {
    5
}
fn default_toast_ttl_ms() -> u64 {
    4000
}
fn default_activity_capacity() -> usize {
    50
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            info_timeout_secs: default_info_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            toast_capacity: default_toast_capacity(),
            toast_ttl_ms: default_toast_ttl_ms(),
            activity_capacity: default_activity_capacity(),
            default_output_template: None,
        }
    }
}

impl ClientConfig {
    /// Applies `DOWNLOADER_WEB_SERVER` when set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var(SERVER_URL_ENV_VAR) {
            let t = v.trim();
            if !t.is_empty() {
                self.server_url = t.to_string();
            }
        }
        self
    }
}

pub fn load_client_config(paths: &AppPaths) -> Result<ClientConfig> {
    let path = paths.client_config_path();
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let bytes = std::fs::read(&path)?;
    let parsed: ClientConfig = serde_json::from_slice(&bytes).map_err(|e| {
        EngineError::Config(format!(
            "failed to parse client config at {}: {e}",
            path.to_string_lossy()
        ))
    })?;
    Ok(parsed)
}

pub fn save_client_config(paths: &AppPaths, config: &ClientConfig) -> Result<()> {
    let path = paths.client_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(())
}
