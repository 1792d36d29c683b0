use serde::{Deserialize, Serialize};

/// Face box in source-frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Landmark position normalized to `[0, 1]` against the frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
}

/// One candidate face in one frame.
///
/// Produced fresh per frame; detections carry no identity across frames.
/// Keypoints keep the detector's order, the first two being the eyes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub score: f64,
    pub keypoints: Vec<Keypoint>,
}

impl Detection {
    /// Confidence as a whole percentage, rounded half up.
    pub fn score_percent(&self) -> i64 {
        (self.score * 100.0).round() as i64
    }

    /// The leading keypoints that mark the eyes (at most two).
    pub fn eye_keypoints(&self) -> &[Keypoint] {
        &self.keypoints[..self.keypoints.len().min(2)]
    }
}
