use serde::{Deserialize, Serialize};

use super::detection_error::DetectionError;

pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MIN_SUPPRESSION_THRESHOLD: f64 = 0.3;

/// Whether the detector serves single images or a timestamped stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunningMode {
    Image,
    Video,
}

impl std::fmt::Display for RunningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunningMode::Image => write!(f, "IMAGE"),
            RunningMode::Video => write!(f, "VIDEO"),
        }
    }
}

/// Preferred inference hardware. `Gpu` falls back to CPU where no
/// accelerated provider exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Delegate {
    Gpu,
    Cpu,
}

impl std::str::FromStr for Delegate {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gpu" => Ok(Delegate::Gpu),
            "cpu" => Ok(Delegate::Cpu),
            other => Err(DetectionError::InvalidOption(format!(
                "delegate must be 'gpu' or 'cpu', got '{other}'"
            ))),
        }
    }
}

/// Construction options for a face detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Local path or http(s) URL of the model file.
    pub model_asset_path: String,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    pub min_detection_confidence: f64,
    pub min_suppression_threshold: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            model_asset_path: String::new(),
            delegate: Delegate::Gpu,
            running_mode: RunningMode::Image,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_suppression_threshold: DEFAULT_MIN_SUPPRESSION_THRESHOLD,
        }
    }
}

impl DetectorOptions {
    pub fn validate(&self) -> Result<(), DetectionError> {
        check_unit_range("min_detection_confidence", self.min_detection_confidence)?;
        check_unit_range("min_suppression_threshold", self.min_suppression_threshold)
    }

    /// Applies the fields present in `update`, validating the result
    /// before committing it.
    pub fn apply(&mut self, update: &OptionsUpdate) -> Result<(), DetectionError> {
        let mut next = self.clone();
        if let Some(mode) = update.running_mode {
            next.running_mode = mode;
        }
        if let Some(c) = update.min_detection_confidence {
            next.min_detection_confidence = c;
        }
        if let Some(t) = update.min_suppression_threshold {
            next.min_suppression_threshold = t;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Partial reconfiguration of a live detector. Model and delegate are
/// fixed at construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionsUpdate {
    pub running_mode: Option<RunningMode>,
    pub min_detection_confidence: Option<f64>,
    pub min_suppression_threshold: Option<f64>,
}

impl OptionsUpdate {
    pub fn running_mode(mode: RunningMode) -> Self {
        Self {
            running_mode: Some(mode),
            ..Self::default()
        }
    }
}

fn check_unit_range(name: &str, value: f64) -> Result<(), DetectionError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DetectionError::InvalidOption(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_start_in_image_mode() {
        let opts = DetectorOptions::default();
        assert_eq!(opts.running_mode, RunningMode::Image);
        assert_eq!(opts.delegate, Delegate::Gpu);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_serde_uses_uppercase_enums() {
        let json = serde_json::to_value(DetectorOptions::default()).unwrap();
        assert_eq!(json["running_mode"], "IMAGE");
        assert_eq!(json["delegate"], "GPU");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let opts: DetectorOptions =
            serde_json::from_str(r#"{"model_asset_path": "face.onnx", "delegate": "CPU"}"#)
                .unwrap();
        assert_eq!(opts.model_asset_path, "face.onnx");
        assert_eq!(opts.delegate, Delegate::Cpu);
        assert_eq!(opts.min_detection_confidence, DEFAULT_MIN_DETECTION_CONFIDENCE);
    }

    #[test]
    fn test_apply_updates_only_given_fields() {
        let mut opts = DetectorOptions::default();
        opts.apply(&OptionsUpdate::running_mode(RunningMode::Video))
            .unwrap();
        assert_eq!(opts.running_mode, RunningMode::Video);
        assert_eq!(opts.min_detection_confidence, DEFAULT_MIN_DETECTION_CONFIDENCE);
    }

    #[test]
    fn test_apply_rejects_invalid_and_keeps_previous() {
        let mut opts = DetectorOptions::default();
        let update = OptionsUpdate {
            running_mode: Some(RunningMode::Video),
            min_detection_confidence: Some(1.5),
            ..OptionsUpdate::default()
        };
        assert!(opts.apply(&update).is_err());
        assert_eq!(opts.running_mode, RunningMode::Image);
    }

    #[test]
    fn test_delegate_from_str() {
        assert_eq!("GPU".parse::<Delegate>().unwrap(), Delegate::Gpu);
        assert_eq!("cpu".parse::<Delegate>().unwrap(), Delegate::Cpu);
        assert!("tpu".parse::<Delegate>().is_err());
    }
}
