use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detector_options::DetectorOptions;
use crate::overlay::domain::live_view::ContainerSize;
use crate::quality::domain::quality_gate::QualityPolicy;
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_REFRESH_HZ, SETTINGS_FILE_NAME};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Persisted demo settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub detector: DetectorOptions,
    pub quality: QualityPolicy,
    /// Capture loop tick rate.
    pub refresh_hz: f64,
    /// Rendered size of the live view; the camera resolution when unset.
    pub container: Option<ContainerSize>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            detector: DetectorOptions::default(),
            quality: QualityPolicy::default(),
            refresh_hz: DEFAULT_REFRESH_HZ,
            container: None,
        }
    }
}

impl DemoConfig {
    /// `<config_dir>/FaceCapture/settings.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        fs::write(path, json).map_err(write_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(0..=100).contains(&self.quality.min_score_percent) {
            return Err(ConfigError::Invalid(format!(
                "min_score_percent must be between 0 and 100, got {}",
                self.quality.min_score_percent
            )));
        }
        if !self.quality.min_face_width.is_finite() || self.quality.min_face_width < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_face_width must be a non-negative number, got {}",
                self.quality.min_face_width
            )));
        }
        if self.quality.max_faces == 0 {
            return Err(ConfigError::Invalid("max_faces must be at least 1".into()));
        }
        if !self.refresh_hz.is_finite() || self.refresh_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "refresh_hz must be positive, got {}",
                self.refresh_hz
            )));
        }
        if let Some(c) = self.container {
            if !(c.width > 0.0 && c.height > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "container size must be positive, got {}x{}",
                    c.width, c.height
                )));
            }
        }
        Ok(())
    }
}
