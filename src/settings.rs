use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.up42.com";

/// Vendor and polling tunables. Everything has a default, so a settings file
/// only needs the keys it overrides.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub token_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub data_block: String,
    pub processing_block: String,
    pub zoom_level: u32,
    pub scene_limit: u32,
    pub max_cloud_cover: u32,
    pub panchromatic_band: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_timeout_secs: 60,
            poll_interval_secs: 5,
            max_poll_attempts: 300,
            data_block: "oneatlas-pleiades-aoiclipped".to_string(),
            processing_block: "sm_veh-detection".to_string(),
            zoom_level: 18,
            scene_limit: 1,
            max_cloud_cover: 100,
            panchromatic_band: false,
        }
    }
}

impl Settings {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
