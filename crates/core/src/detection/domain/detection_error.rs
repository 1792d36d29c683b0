use thiserror::Error;

use super::detector_options::RunningMode;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("detector is in {actual} mode, call requires {expected} mode")]
    WrongRunningMode {
        expected: RunningMode,
        actual: RunningMode,
    },
    #[error("video timestamps must increase: got {current}ms after {previous}ms")]
    NonMonotonicTimestamp { previous: f64, current: f64 },
    #[error("invalid detector option: {0}")]
    InvalidOption(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),
    #[error("failed to read recorded detections: {0}")]
    Recording(String),
}
