use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::detection_error::DetectionError;
use super::detector_options::{OptionsUpdate, RunningMode};

/// Domain interface for a face-detection runtime.
///
/// A detector is created in one running mode and may be switched with
/// [`FaceDetector::set_options`]. `detect` serves `Image` mode,
/// `detect_for_video` serves `Video` mode and requires strictly
/// increasing timestamps.
pub trait FaceDetector: Send {
    fn running_mode(&self) -> RunningMode;

    fn set_options(&mut self, update: &OptionsUpdate) -> Result<(), DetectionError>;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;

    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, DetectionError>;
}

/// Running-mode bookkeeping shared by detector implementations.
#[derive(Clone, Debug)]
pub struct ModeGuard {
    mode: RunningMode,
    last_timestamp_ms: Option<f64>,
}

impl ModeGuard {
    pub fn new(mode: RunningMode) -> Self {
        Self {
            mode,
            last_timestamp_ms: None,
        }
    }

    pub fn mode(&self) -> RunningMode {
        self.mode
    }

    /// Switching modes restarts the timestamp sequence.
    pub fn set_mode(&mut self, mode: RunningMode) {
        if mode != self.mode {
            self.mode = mode;
            self.last_timestamp_ms = None;
        }
    }

    pub fn check_image(&self) -> Result<(), DetectionError> {
        self.require(RunningMode::Image)
    }

    /// Validates and records a video timestamp.
    pub fn check_video(&mut self, timestamp_ms: f64) -> Result<(), DetectionError> {
        self.require(RunningMode::Video)?;
        if let Some(previous) = self.last_timestamp_ms {
            if timestamp_ms <= previous {
                return Err(DetectionError::NonMonotonicTimestamp {
                    previous,
                    current: timestamp_ms,
                });
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);
        Ok(())
    }

    fn require(&self, expected: RunningMode) -> Result<(), DetectionError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(DetectionError::WrongRunningMode {
                expected,
                actual: self.mode,
            })
        }
    }
}
