use std::fs;
use std::path::Path;

use base64::prelude::{Engine as _, BASE64_STANDARD};

use crate::shared::frame::Frame;

use super::capture_error::CaptureError;

/// A still taken from the live view, encoded as PNG.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn new(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self { png, width, height }
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `data:image/png;base64,...`, ready to use as an image source.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64_STANDARD.encode(&self.png))
    }

    pub fn save(&self, path: &Path) -> Result<(), CaptureError> {
        let write_error = |source| CaptureError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, &self.png).map_err(write_error)
    }
}

/// Turns a presented frame into a still image.
pub trait StillEncoder: Send {
    fn encode(&self, frame: &Frame) -> Result<CapturedImage, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_prefix_and_payload() {
        let image = CapturedImage::new(vec![1, 2, 3], 1, 1);
        assert_eq!(image.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stills").join("capture.png");
        CapturedImage::new(vec![9, 9], 1, 1).save(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![9, 9]);
    }
}
