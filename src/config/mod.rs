use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Device;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcription defaults, overridden by command-line flags
    pub transcription: TranscriptionDefaults,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionDefaults {
    /// Model size or path to a ggml model file
    pub model: String,

    /// Compute device
    pub device: Device,

    /// Forced language code (auto-detect if not specified)
    pub language: Option<String>,

    /// Annotate transcripts with timestamps
    pub timestamps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output file used when none is given on the command line
    pub default_output: PathBuf,

    /// Directory holding downloaded models
    pub models_dir: Option<PathBuf>,

    /// Directory for temporary downloads (working directory if not set)
    pub temp_dir: Option<PathBuf>,
}

impl Default for TranscriptionDefaults {
    fn default() -> Self {
        Self {
            model: "medium".to_string(),
            device: Device::Auto,
            language: None,
            timestamps: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output: PathBuf::from("transcription.txt"),
            models_dir: None,
            temp_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when there is none
    pub async fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                tracing::debug!("No config directory available, using defaults: {:#}", e);
                Ok(Self::default())
            }
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("quill").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.transcription.model.trim().is_empty() {
            anyhow::bail!("transcription.model must not be empty");
        }

        if self.app.default_output.as_os_str().is_empty() {
            anyhow::bail!("app.default_output must not be empty");
        }

        Ok(())
    }

    /// Directory where ggml models are cached
    pub fn models_dir(&self) -> Result<PathBuf> {
        match &self.app.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir()
                .map(|dir| dir.join("quill").join("models"))
                .context("Could not determine cache directory"),
        }
    }

    /// Directory where temporary audio downloads are placed
    pub fn temp_dir(&self) -> PathBuf {
        self.app
            .temp_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Model: {}", self.transcription.model);
        println!("  Device: {}", self.transcription.device);
        println!(
            "  Language: {}",
            self.transcription.language.as_deref().unwrap_or("auto-detect")
        );
        println!("  Timestamps: {}", self.transcription.timestamps);
        println!("  Default Output: {}", self.app.default_output.display());
        match self.models_dir() {
            Ok(dir) => println!("  Models Directory: {}", dir.display()),
            Err(_) => println!("  Models Directory: <unavailable>"),
        }
        println!("  Temp Directory: {}", self.temp_dir().display());
    }
}
