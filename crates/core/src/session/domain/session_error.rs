use thiserror::Error;

use crate::detection::domain::detection_error::DetectionError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Face Detector is still loading. Please try again..")]
    StillLoading,
    #[error("face detector failed to load: {0}")]
    LoadFailed(String),
    #[error("failed to switch detector to VIDEO mode: {0}")]
    ModeSwitch(#[source] DetectionError),
}
