use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera capture is not supported: {0}")]
    Unsupported(String),
    #[error("constraints must request video")]
    VideoNotRequested,
    #[error("failed to acquire camera: {0}")]
    Acquisition(String),
    #[error("camera has not been acquired")]
    NotAcquired,
}
