use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::detector_options::{OptionsUpdate, RunningMode};
use crate::detection::domain::face_detector::{FaceDetector, ModeGuard};
use crate::shared::detection::{BoundingBox, Detection, Keypoint};
use crate::shared::frame::Frame;

/// Replays recorded detection results by frame index.
///
/// Lets the live loop run against a camera source without a model, e.g.
/// to check overlay placement and gating against a known recording.
/// Frames without an entry get the recording's `default` list.
pub struct ReplayFaceDetector {
    frames: HashMap<usize, Vec<Detection>>,
    fallback: Vec<Detection>,
    guard: ModeGuard,
}

/// On-disk layout, matching the detector runtime's result shape.
#[derive(Deserialize)]
struct Recording {
    #[serde(default)]
    frames: Vec<RecordedFrame>,
    #[serde(default)]
    default: Vec<RecordedDetection>,
}

#[derive(Deserialize)]
struct RecordedFrame {
    frame: usize,
    detections: Vec<RecordedDetection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordedDetection {
    bounding_box: BoundingBox,
    categories: Vec<RecordedCategory>,
    #[serde(default)]
    keypoints: Vec<Keypoint>,
}

#[derive(Deserialize)]
struct RecordedCategory {
    score: f64,
}

impl RecordedDetection {
    fn into_detection(self) -> Result<Detection, DetectionError> {
        let score = self
            .categories
            .first()
            .map(|c| c.score)
            .ok_or_else(|| DetectionError::Recording("detection without categories".into()))?;
        Ok(Detection {
            bounding_box: self.bounding_box,
            score,
            keypoints: self.keypoints,
        })
    }
}

impl ReplayFaceDetector {
    pub fn new(frames: HashMap<usize, Vec<Detection>>, fallback: Vec<Detection>) -> Self {
        Self {
            frames,
            fallback,
            guard: ModeGuard::new(RunningMode::Image),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DetectionError> {
        let recording: Recording =
            serde_json::from_str(json).map_err(|e| DetectionError::Recording(e.to_string()))?;
        let mut frames = HashMap::new();
        for f in recording.frames {
            let detections = f
                .detections
                .into_iter()
                .map(RecordedDetection::into_detection)
                .collect::<Result<Vec<_>, _>>()?;
            frames.insert(f.frame, detections);
        }
        let fallback = recording
            .default
            .into_iter()
            .map(RecordedDetection::into_detection)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(frames, fallback))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DetectionError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DetectionError::Recording(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    fn lookup(&self, frame: &Frame) -> Vec<Detection> {
        self.frames
            .get(&frame.index())
            .unwrap_or(&self.fallback)
            .clone()
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn running_mode(&self) -> RunningMode {
        self.guard.mode()
    }

    fn set_options(&mut self, update: &OptionsUpdate) -> Result<(), DetectionError> {
        if let Some(mode) = update.running_mode {
            self.guard.set_mode(mode);
        }
        Ok(())
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.guard.check_image()?;
        Ok(self.lookup(frame))
    }

    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, DetectionError> {
        self.guard.check_video(timestamp_ms)?;
        Ok(self.lookup(frame))
    }
}
