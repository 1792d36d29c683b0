use std::fmt;

use serde::Serialize;

use crate::shared::frame::Frame;

use super::camera_error::CameraError;

/// What the demo asks of a camera. Only video is ever requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraConstraints {
    pub video: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self { video: true }
    }
}

/// Properties of the acquired stream, reported once after acquisition.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub codec: String,
    pub source: String,
}

impl fmt::Display for CameraSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {:.2} fps ({}, {})",
            self.width, self.height, self.frame_rate, self.codec, self.source
        )
    }
}

/// A live video element: something that plays a camera stream on its own
/// clock and can be sampled for the currently presented frame.
pub trait FrameSource: Send {
    /// Whether this environment can provide camera frames at all.
    fn is_supported(&self) -> bool;

    fn acquire(&mut self, constraints: &CameraConstraints) -> Result<CameraSettings, CameraError>;

    /// Playback time of the presented frame in seconds. Advances only when a
    /// new frame is presented; `None` before acquisition and after the
    /// stream has ended.
    fn current_time(&mut self) -> Option<f64>;

    fn current_frame(&self) -> Option<&Frame>;

    fn release(&mut self);
}
