//! Scripted doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::camera::domain::camera_error::CameraError;
use crate::camera::domain::frame_source::{CameraConstraints, CameraSettings, FrameSource};
use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::detector_options::{OptionsUpdate, RunningMode};
use crate::detection::domain::face_detector::{FaceDetector, ModeGuard};
use crate::shared::detection::{BoundingBox, Detection, Keypoint};
use crate::shared::frame::Frame;

pub(crate) fn face(score: f64, width: f64) -> Detection {
    Detection {
        bounding_box: BoundingBox {
            origin_x: 100.0,
            origin_y: 80.0,
            width,
            height: width,
        },
        score,
        keypoints: vec![Keypoint { x: 0.4, y: 0.3 }, Keypoint { x: 0.5, y: 0.3 }],
    }
}

/// Returns queued results in order, then empty lists. Records the
/// timestamp of every video call.
pub(crate) struct ScriptedDetector {
    results: VecDeque<Result<Vec<Detection>, String>>,
    guard: ModeGuard,
    calls: Arc<Mutex<Vec<f64>>>,
}

impl ScriptedDetector {
    pub(crate) fn new(results: Vec<Result<Vec<Detection>, String>>) -> Self {
        Self {
            results: results.into(),
            guard: ModeGuard::new(RunningMode::Image),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<f64>>> {
        self.calls.clone()
    }

    fn next_result(&mut self) -> Result<Vec<Detection>, DetectionError> {
        self.results
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
            .map_err(DetectionError::Inference)
    }
}

impl FaceDetector for ScriptedDetector {
    fn running_mode(&self) -> RunningMode {
        self.guard.mode()
    }

    fn set_options(&mut self, update: &OptionsUpdate) -> Result<(), DetectionError> {
        if let Some(mode) = update.running_mode {
            self.guard.set_mode(mode);
        }
        Ok(())
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.guard.check_image()?;
        self.next_result()
    }

    fn detect_for_video(
        &mut self,
        _frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, DetectionError> {
        self.guard.check_video(timestamp_ms)?;
        self.calls.lock().unwrap().push(timestamp_ms);
        self.next_result()
    }
}

/// Presents one playback time per `current_time` call, then ends.
pub(crate) struct ScriptedSource {
    times: VecDeque<f64>,
    frame: Option<Frame>,
    supported: bool,
    next_index: usize,
}

impl ScriptedSource {
    pub(crate) fn new(times: &[f64]) -> Self {
        Self {
            times: times.iter().copied().collect(),
            frame: None,
            supported: true,
            next_index: 0,
        }
    }

    pub(crate) fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(&[])
        }
    }
}

impl FrameSource for ScriptedSource {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn acquire(&mut self, constraints: &CameraConstraints) -> Result<CameraSettings, CameraError> {
        if !constraints.video {
            return Err(CameraError::VideoNotRequested);
        }
        Ok(CameraSettings {
            width: 4,
            height: 2,
            frame_rate: 30.0,
            codec: "scripted".into(),
            source: "scripted".into(),
        })
    }

    fn current_time(&mut self) -> Option<f64> {
        let time = self.times.pop_front()?;
        let same_frame = self.frame.as_ref().is_some_and(|f| f.timestamp() == time);
        if !same_frame {
            let mut data = vec![0u8; 4 * 2 * 3];
            data[0] = self.next_index as u8;
            self.frame = Some(Frame::new(data, 4, 2, 3, self.next_index).with_timestamp(time));
            self.next_index += 1;
        }
        Some(time)
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    fn release(&mut self) {
        self.times.clear();
        self.frame = None;
    }
}
