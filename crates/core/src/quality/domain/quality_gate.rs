use std::fmt;

use serde::{Deserialize, Serialize};

use crate::overlay::domain::live_view::LiveView;
use crate::shared::detection::Detection;

pub const DEFAULT_MIN_SCORE_PERCENT: i64 = 70;
pub const DEFAULT_MIN_FACE_WIDTH: f64 = 130.0;
pub const DEFAULT_MAX_FACES: usize = 1;

/// Thresholds a frame must meet before a still may be captured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    /// Lowest accepted rounded score percentage.
    pub min_score_percent: i64,
    /// Narrowest accepted bounding box, in source pixels.
    pub min_face_width: f64,
    pub max_faces: usize,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            min_score_percent: DEFAULT_MIN_SCORE_PERCENT,
            min_face_width: DEFAULT_MIN_FACE_WIDTH,
            max_faces: DEFAULT_MAX_FACES,
        }
    }
}

/// Why a frame was rejected. Variants are listed in check order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QualityIssue {
    MultiplePeople { count: usize },
    LowScore { percent: i64, threshold: i64 },
    TooFarAway { width: f64 },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::MultiplePeople { .. } => write!(f, "multiple people detected"),
            QualityIssue::LowScore { threshold, .. } => {
                write!(f, "face detection score is less than {threshold}")
            }
            QualityIssue::TooFarAway { .. } => write!(f, "standing too far away, step forward"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityVerdict {
    pub capture_allowed: bool,
    pub issue: Option<QualityIssue>,
}

impl QualityVerdict {
    fn allowed() -> Self {
        Self {
            capture_allowed: true,
            issue: None,
        }
    }

    /// Nothing to capture and nothing to tell the user.
    fn withheld() -> Self {
        Self {
            capture_allowed: false,
            issue: None,
        }
    }

    fn rejected(issue: QualityIssue) -> Self {
        Self {
            capture_allowed: false,
            issue: Some(issue),
        }
    }

    /// The instructional message to display, if any.
    pub fn message(&self) -> Option<String> {
        self.issue.as_ref().map(ToString::to_string)
    }
}

/// Decides per frame whether capture is permitted.
#[derive(Clone, Debug, Default)]
pub struct QualityGate {
    policy: QualityPolicy,
}

impl QualityGate {
    pub fn new(policy: QualityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &QualityPolicy {
        &self.policy
    }

    /// First failing check wins: face count, then score, then size.
    /// An empty frame keeps capture off without an instruction.
    pub fn evaluate(&self, detections: &[Detection]) -> QualityVerdict {
        let p = &self.policy;
        if detections.len() > p.max_faces {
            return QualityVerdict::rejected(QualityIssue::MultiplePeople {
                count: detections.len(),
            });
        }
        if let Some(d) = detections
            .iter()
            .find(|d| d.score_percent() < p.min_score_percent)
        {
            return QualityVerdict::rejected(QualityIssue::LowScore {
                percent: d.score_percent(),
                threshold: p.min_score_percent,
            });
        }
        if let Some(d) = detections
            .iter()
            .find(|d| d.bounding_box.width < p.min_face_width)
        {
            return QualityVerdict::rejected(QualityIssue::TooFarAway {
                width: d.bounding_box.width,
            });
        }
        if detections.is_empty() {
            return QualityVerdict::withheld();
        }
        QualityVerdict::allowed()
    }

    /// Reflects a verdict on the capture control and instruction element.
    pub fn apply(&self, verdict: &QualityVerdict, view: &mut dyn LiveView) {
        view.set_capture_enabled(verdict.capture_allowed);
        match verdict.message() {
            Some(message) => view.show_instruction(&message),
            None => view.hide_instruction(),
        }
    }
}
