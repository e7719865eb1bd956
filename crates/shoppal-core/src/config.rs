use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/agent";
pub const ENDPOINT_ENV: &str = "SHOPPAL_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Agent endpoint that receives `POST {session_id, message}`
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Send an empty message on startup so the agent greets first
    pub auto_greet: bool,
    pub image_max_width_px: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
            auto_greet: true,
            image_max_width_px: 200,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("shoppal").join("config.json"))
    }
}
