use std::io::Cursor;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::captured_image::{CapturedImage, StillEncoder};
use crate::shared::frame::Frame;

/// Encodes frames as PNG at their native resolution, unmirrored.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngStillEncoder;

impl PngStillEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl StillEncoder for PngStillEncoder {
    fn encode(&self, frame: &Frame) -> Result<CapturedImage, CaptureError> {
        if frame.channels() != 3 {
            return Err(CaptureError::Encode(format!(
                "expected 3 channels, got {}",
                frame.channels()
            )));
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| CaptureError::Encode("frame data does not match its size".into()))?;

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(CapturedImage::new(png, frame.width(), frame.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let data = (0..width * height)
            .flat_map(|i| [(i * 10) as u8, 0, 255 - (i * 10) as u8])
            .collect();
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_png_round_trips_pixels() {
        let frame = gradient(4, 3);
        let still = PngStillEncoder::new().encode(&frame).unwrap();
        assert_eq!((still.width(), still.height()), (4, 3));

        let decoded = image::load_from_memory(still.png_bytes()).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.as_raw(), frame.data());
    }

    #[test]
    fn test_data_url_decodes_to_png() {
        let still = PngStillEncoder::new().encode(&gradient(2, 2)).unwrap();
        let url = still.data_url();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = BASE64_STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_rejects_non_rgb_frames() {
        let frame = Frame::new(vec![0u8; 4], 2, 2, 1, 0);
        assert!(matches!(
            PngStillEncoder::new().encode(&frame),
            Err(CaptureError::Encode(_))
        ));
    }
}
