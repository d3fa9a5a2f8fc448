use genai::{AnimationStyle, AspectRatio, BackendConfig, OutputType, VideoDuration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::poller::DEFAULT_POLL_INTERVAL;

/// Option values a fresh session starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionDefaults {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub output_type: OutputType,
    #[serde(default)]
    pub video_duration: VideoDuration,
    #[serde(default)]
    pub animation_style: AnimationStyle,
}

/// Studio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub defaults: SessionDefaults,

    /// Delay between video status polls, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Where downloads are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_output_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("genstudio")
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            defaults: SessionDefaults::default(),
            poll_interval_secs: default_poll_interval_secs(),
            output_dir: default_output_dir(),
        }
    }
}

impl StudioConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Default location: `<config dir>/genstudio/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("genstudio").join("config.json"))
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
