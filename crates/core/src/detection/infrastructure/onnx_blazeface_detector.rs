//! BlazeFace short-range face detector on ONNX Runtime.
//!
//! Produces boxes in frame pixels plus the six BlazeFace keypoints
//! (right eye, left eye, nose tip, mouth, right ear, left ear) normalized
//! to the frame.
use std::path::Path;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::detector_options::{DetectorOptions, OptionsUpdate, RunningMode};
use crate::detection::domain::face_detector::{FaceDetector, ModeGuard};
use crate::detection::infrastructure::execution_provider::execution_providers_for;
use crate::detection::infrastructure::model_resolver::{self, ProgressFn};
use crate::shared::detection::{BoundingBox, Detection, Keypoint};
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

const NUM_KEYPOINTS: usize = 6;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    options: DetectorOptions,
    guard: ModeGuard,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    /// Resolves the configured model asset and builds a detector from it.
    pub fn create_from_options(
        options: &DetectorOptions,
        bundled_dir: Option<&Path>,
        progress: Option<ProgressFn>,
    ) -> Result<Self, DetectionError> {
        options.validate()?;
        let model_path = model_resolver::resolve_asset(&options.model_asset_path, bundled_dir, progress)
            .map_err(|e| DetectionError::ModelLoad(e.to_string()))?;
        Self::new(&model_path, options.clone())
    }

    /// Load a BlazeFace ONNX model from disk.
    pub fn new(model_path: &Path, options: DetectorOptions) -> Result<Self, DetectionError> {
        let session = ort::session::Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .with_execution_providers(execution_providers_for(options.delegate))
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;
        log::info!(
            "Loaded face detector {} (delegate {:?}, mode {})",
            model_path.display(),
            options.delegate,
            options.running_mode
        );
        Ok(Self {
            guard: ModeGuard::new(options.running_mode),
            session,
            options,
            anchors: generate_anchors(),
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let Some(input_tensor) = preprocess(frame, INPUT_SIZE) else {
            log::debug!("Skipping empty frame {}", frame.index());
            return Ok(Vec::new());
        };
        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(DetectionError::UnexpectedOutput(format!(
                "expected 2 outputs, got {}",
                outputs.len()
            )));
        }
        let regressors = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::UnexpectedOutput(e.to_string()))?;
        let scores = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::UnexpectedOutput(e.to_string()))?;
        let reg_data = regressors
            .as_slice()
            .ok_or_else(|| DetectionError::UnexpectedOutput("regressors not contiguous".into()))?;
        let score_data = scores
            .as_slice()
            .ok_or_else(|| DetectionError::UnexpectedOutput("scores not contiguous".into()))?;

        let mut candidates = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.options.min_detection_confidence as f32,
        );
        let kept = nms(&mut candidates, self.options.min_suppression_threshold);
        Ok(kept
            .iter()
            .map(|c| c.to_detection(frame.width(), frame.height()))
            .collect())
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn running_mode(&self) -> RunningMode {
        self.guard.mode()
    }

    fn set_options(&mut self, update: &OptionsUpdate) -> Result<(), DetectionError> {
        self.options.apply(update)?;
        self.guard.set_mode(self.options.running_mode);
        Ok(())
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.guard.check_image()?;
        self.infer(frame)
    }

    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, DetectionError> {
        self.guard.check_video(timestamp_ms)?;
        self.infer(frame)
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> DetectionError {
    DetectionError::ModelLoad(format!("{}: {e}", path.display()))
}

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
/// `None` for a frame with no pixels.
fn preprocess(frame: &Frame, size: u32) -> Option<ndarray::Array4<f32>> {
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    if src_h == 0 || src_w == 0 {
        return None;
    }
    let src = frame.as_ndarray();
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }
    Some(tensor)
}

/// Anchor centers for the short-range model: a 16×16 grid with 2 anchors
/// per cell followed by an 8×8 grid with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for &(stride, per_cell) in &strides {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let center = [
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }
    anchors
}

/// Candidate face in normalized [0,1] input coordinates.
#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
    keypoints: [[f64; 2]; NUM_KEYPOINTS],
}

impl Candidate {
    fn to_detection(&self, frame_w: u32, frame_h: u32) -> Detection {
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        let x1 = self.x1.clamp(0.0, 1.0) * fw;
        let y1 = self.y1.clamp(0.0, 1.0) * fh;
        let x2 = self.x2.clamp(0.0, 1.0) * fw;
        let y2 = self.y2.clamp(0.0, 1.0) * fh;
        Detection {
            bounding_box: BoundingBox {
                origin_x: x1,
                origin_y: y1,
                width: x2 - x1,
                height: y2 - y1,
            },
            score: self.score,
            keypoints: self
                .keypoints
                .iter()
                .map(|&[x, y]| Keypoint { x, y })
                .collect(),
        }
    }
}

fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    min_confidence: f32,
) -> Vec<Candidate> {
    let size = INPUT_SIZE as f32;
    let mut out = Vec::new();
    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < min_confidence {
            continue;
        }
        let base = i * REGRESSOR_STRIDE;
        let Some(reg) = reg_data.get(base..base + REGRESSOR_STRIDE) else {
            break;
        };
        let [ax, ay] = anchors[i];
        let cx = ax + reg[0] / size;
        let cy = ay + reg[1] / size;
        let w = reg[2] / size;
        let h = reg[3] / size;

        let mut keypoints = [[0.0f64; 2]; NUM_KEYPOINTS];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            kp[0] = (ax + reg[4 + 2 * k] / size) as f64;
            kp[1] = (ay + reg[5 + 2 * k] / size) as f64;
        }

        out.push(Candidate {
            x1: (cx - w / 2.0) as f64,
            y1: (cy - h / 2.0) as f64,
            x2: (cx + w / 2.0) as f64,
            y2: (cy + h / 2.0) as f64,
            score: score as f64,
            keypoints,
        });
    }
    out
}

fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates.iter() {
        if keep.iter().all(|k| iou(k, c) <= iou_thresh) {
            keep.push(c.clone());
        }
    }
    keep
}

fn iou(a: &Candidate, b: &Candidate) -> f64 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
