//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides [`BackendConfig::base_url`].
pub const BACKEND_URL_ENV: &str = "REELKIT_BACKEND_URL";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Render backend connection settings.
    pub backend: BackendConfig,

    /// Live preview defaults.
    pub preview: PreviewDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where the project/render backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.example.com/v1`.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Optional bearer token sent with every request.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Interval between status polls while waiting on a render.
    pub poll_interval_secs: u64,
}

/// Defaults used by the editor and the preview player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewDefaults {
    /// FPS assumed when a project does not declare one.
    pub fps: u32,

    /// Length of a freshly inserted scene.
    pub default_scene_secs: u32,

    /// Composition length used when a project has no scenes.
    pub fallback_duration_secs: u32,

    /// Initial playback rate.
    pub playback_rate: f64,

    /// Whether playback loops by default.
    pub loop_playback: bool,

    /// How long parsed caption tracks stay cached.
    pub caption_cache_ttl_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelkit=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            preview: PreviewDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_secs: 30,
            api_token: None,
            poll_interval_secs: 5,
        }
    }
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            default_scene_secs: 3,
            fallback_duration_secs: 30,
            playback_rate: 1.0,
            loop_playback: false,
            caption_cache_ttl_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// `REELKIT_BACKEND_URL` wins over whatever the file says.
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_default();
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                config.backend.base_url = url;
            }
        }
        config
    }

    fn load_file() -> Option<Self> {
        let config_path = config_file_path();
        if !config_path.exists() {
            return None;
        }
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                None
            }
        }
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelkit").join("config.json")
}
