use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture is disabled for the current frame")]
    NotPermitted,
    #[error("no frame has been presented yet")]
    NoFrame,
    #[error("failed to encode still: {0}")]
    Encode(String),
    #[error("failed to write still to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
