//! Configuration loading for mixcut
//!
//! Resolution priority per setting: environment variable → TOML config
//! file → compiled default. The config file path itself comes from
//! `MIXCUT_CONFIG`, falling back to `./mixcut.toml` when present.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Root directory for per-operation temp files
    pub temp_dir: PathBuf,
    /// Transcoding engine binary
    pub ffmpeg_path: PathBuf,
    /// Upper bound on one engine invocation, in seconds; 0 disables the bound
    pub transcode_timeout_secs: u64,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
    /// Speech synthesis settings
    pub tts: TtsConfig,
    /// Voice cloning collaborator base URL (e.g. http://localhost:5001)
    pub clone_service_url: Option<String>,
}

/// Speech synthesis provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// The one language tag served by the remote provider
    pub remote_language: String,
    /// Remote provider base URL
    pub remote_url: Option<String>,
    /// Local synthesis engine binary
    pub engine_path: PathBuf,
    /// Voice used when the mapped voice is unavailable
    pub default_voice: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            database_path: PathBuf::from("mixcut.db"),
            temp_dir: std::env::temp_dir().join("mixcut"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            transcode_timeout_secs: 120,
            max_upload_bytes: 10 * 1024 * 1024,
            tts: TtsConfig::default(),
            clone_service_url: None,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            remote_language: "ro-RO".to_string(),
            remote_url: None,
            engine_path: PathBuf::from("espeak-ng"),
            default_voice: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("MIXCUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("mixcut.toml"));

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let parsed: Config = toml::from_str(&contents)?;
            info!(path = %config_path.display(), "Loaded configuration file");
            parsed
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take priority over the TOML file
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("MIXCUT_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(path) = std::env::var("MIXCUT_DATABASE") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("MIXCUT_TEMP_DIR") {
            self.temp_dir = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("MIXCUT_FFMPEG") {
            self.ffmpeg_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("MIXCUT_TTS_REMOTE_URL") {
            self.tts.remote_url = Some(url);
        }
        if let Ok(url) = std::env::var("MIXCUT_CLONE_URL") {
            self.clone_service_url = Some(url);
        }
    }

    /// Engine invocation bound; `None` means wait indefinitely
    pub fn transcode_timeout(&self) -> Option<Duration> {
        if self.transcode_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.transcode_timeout_secs))
        }
    }
}
