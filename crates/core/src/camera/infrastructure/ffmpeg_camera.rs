use std::path::Path;
use std::time::Instant;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::camera::domain::camera_error::CameraError;
use crate::camera::domain::frame_source::{CameraConstraints, CameraSettings, FrameSource};
use crate::shared::constants::FALLBACK_FRAME_DURATION_SECS;
use crate::shared::frame::Frame;

/// Plays a libavformat input (capture device, stream URL or file) as a
/// live camera.
///
/// Devices that need an explicit input format are addressed as
/// `format:device`, e.g. `avfoundation:0`, `dshow:video=USB Camera` or
/// `v4l2:/dev/video0`. Plain device nodes and files are opened as-is.
///
/// Frames are decoded to RGB24 and presented against the wall clock from
/// the first sample: [`FrameSource::current_time`] reports the newest frame
/// whose presentation time has passed, so polling faster than the stream's
/// frame rate sees the same time repeatedly.
pub struct FfmpegCamera {
    source: String,
    stream: Option<DecodeState>,
    presented: Option<Frame>,
    pending: Option<Frame>,
    ended: bool,
    started: Option<Instant>,
    first_pts: Option<f64>,
    frame_duration: f64,
}

// Safety: FfmpegCamera is driven from one thread at a time; the ffmpeg
// contexts it owns are never shared.
unsafe impl Send for FfmpegCamera {}

struct DecodeState {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    time_base: f64,
    width: u32,
    height: u32,
    frame_duration: f64,
    next_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegCamera {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stream: None,
            presented: None,
            pending: None,
            ended: false,
            started: None,
            first_pts: None,
            frame_duration: FALLBACK_FRAME_DURATION_SECS,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn open(&self) -> Result<(DecodeState, CameraSettings), CameraError> {
        ffmpeg_next::init().map_err(acquisition)?;
        ffmpeg_next::device::register_all();

        let ictx = match parse_source(&self.source) {
            SourceAddress::Device { format, device } if !Path::new(&self.source).exists() => {
                open_device(format, device)?
            }
            _ => ffmpeg_next::format::input(&self.source).map_err(acquisition)?,
        };
        let (stream_index, parameters, rate, time_base) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| {
                    CameraError::Unsupported(format!("{} has no video stream", self.source))
                })?;
            (
                stream.index(),
                stream.parameters(),
                stream.rate(),
                stream.time_base(),
            )
        };

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)
            .and_then(|ctx| ctx.decoder().video())
            .map_err(acquisition)?;
        let width = decoder.width();
        let height = decoder.height();
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(acquisition)?;

        let frame_rate = ratio(rate.numerator(), rate.denominator());
        let frame_duration = if frame_rate > 0.0 {
            1.0 / frame_rate
        } else {
            FALLBACK_FRAME_DURATION_SECS
        };
        let settings = CameraSettings {
            width,
            height,
            frame_rate,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: self.source.clone(),
        };

        let state = DecodeState {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base: ratio(time_base.numerator(), time_base.denominator()),
            width,
            height,
            frame_duration,
            next_index: 0,
            flushing: false,
            done: false,
        };
        Ok((state, settings))
    }
}

impl FrameSource for FfmpegCamera {
    fn is_supported(&self) -> bool {
        match parse_source(&self.source) {
            SourceAddress::Url => true,
            SourceAddress::Device { format, .. } => {
                device_format(format).is_some() || Path::new(&self.source).exists()
            }
            SourceAddress::Path => Path::new(&self.source).exists(),
        }
    }

    fn acquire(&mut self, constraints: &CameraConstraints) -> Result<CameraSettings, CameraError> {
        if !constraints.video {
            return Err(CameraError::VideoNotRequested);
        }
        self.release();
        let (state, settings) = self.open()?;
        self.frame_duration = state.frame_duration;
        self.stream = Some(state);
        Ok(settings)
    }

    fn current_time(&mut self) -> Option<f64> {
        let state = self.stream.as_mut()?;
        let elapsed = self.started.get_or_insert_with(Instant::now).elapsed().as_secs_f64();

        loop {
            if self.pending.is_none() && !self.ended {
                self.pending = state.next_frame();
                self.ended = self.pending.is_none();
            }
            match self.pending.take() {
                Some(frame) => {
                    let first = *self.first_pts.get_or_insert(frame.timestamp());
                    if self.presented.is_none() || frame.timestamp() - first <= elapsed {
                        self.presented = Some(frame);
                        continue;
                    }
                    self.pending = Some(frame);
                    break;
                }
                None => {
                    let last = self.presented.as_ref()?.timestamp();
                    let first = self.first_pts.unwrap_or(last);
                    if last - first + self.frame_duration <= elapsed {
                        return None;
                    }
                    break;
                }
            }
        }
        self.presented.as_ref().map(Frame::timestamp)
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.presented.as_ref()
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Released camera {}", self.source);
        }
        self.presented = None;
        self.pending = None;
        self.ended = false;
        self.started = None;
        self.first_pts = None;
    }
}

impl DecodeState {
    fn next_frame(&mut self) -> Option<Frame> {
        loop {
            if self.done {
                return None;
            }
            if let Some(frame) = self.try_receive() {
                return Some(frame);
            }
            if self.flushing {
                self.done = true;
                return None;
            }
            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        if let Err(e) = self.decoder.send_packet(&packet) {
                            log::debug!("Dropping undecodable packet: {e}");
                        }
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn try_receive(&mut self) -> Option<Frame> {
        let mut decoded = Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb = Video::empty();
            if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
                log::warn!("Skipping frame that failed pixel conversion: {e}");
                continue;
            }
            let index = self.next_index;
            self.next_index += 1;
            let timestamp = decoded
                .timestamp()
                .or_else(|| decoded.pts())
                .map(|pts| pts as f64 * self.time_base)
                .unwrap_or(index as f64 * self.frame_duration);
            let pixels = packed_rgb(&rgb, self.width, self.height);
            return Some(
                Frame::new(pixels, self.width, self.height, 3, index).with_timestamp(timestamp),
            );
        }
        None
    }
}

#[derive(Debug, PartialEq)]
enum SourceAddress<'a> {
    Url,
    Device { format: &'a str, device: &'a str },
    Path,
}

fn parse_source(source: &str) -> SourceAddress<'_> {
    if source.contains("://") {
        return SourceAddress::Url;
    }
    match source.split_once(':') {
        // A single letter before the colon is a Windows drive.
        Some((format, device))
            if format.len() > 1
                && !device.is_empty()
                && format
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') =>
        {
            SourceAddress::Device { format, device }
        }
        _ => SourceAddress::Path,
    }
}

/// Looks up a registered capture-device input format by name.
fn device_format(name: &str) -> Option<ffmpeg_next::format::Input> {
    ffmpeg_next::init().ok()?;
    ffmpeg_next::device::register_all();
    ffmpeg_next::device::input::video().find(|f| f.name() == name)
}

fn open_device(format: &str, device: &str) -> Result<Input, CameraError> {
    let input_format = device_format(format).ok_or_else(|| {
        CameraError::Unsupported(format!("ffmpeg has no {format} capture device support"))
    })?;
    let format_kind = ffmpeg_next::format::format::Format::Input(input_format);
    match ffmpeg_next::format::open(device, &format_kind).map_err(acquisition)? {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        ffmpeg_next::format::context::Context::Output(_) => Err(CameraError::Acquisition(
            format!("{format} opened {device} as an output"),
        )),
    }
}

fn ratio(numerator: i32, denominator: i32) -> f64 {
    if denominator != 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

fn acquisition(e: ffmpeg_next::Error) -> CameraError {
    CameraError::Acquisition(e.to_string())
}

/// Strips per-row stride padding from an RGB24 ffmpeg frame.
fn packed_rgb(rgb: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;
    use std::time::Duration;

    fn write_test_video(path: &Path, frames: usize, width: u32, height: u32, fps: i32) {
        ffmpeg_next::init().unwrap();
        let mut octx = ffmpeg_next::format::output(&path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut to_yuv = scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..=frames {
            if i < frames {
                let mut rgb = Video::new(ffmpeg_next::format::Pixel::RGB24, width, height);
                rgb.data_mut(0).fill(((i * 60) % 256) as u8);
                let mut yuv = Video::empty();
                to_yuv.run(&rgb, &mut yuv).unwrap();
                yuv.set_pts(Some(i as i64));
                encoder.send_frame(&yuv).unwrap();
            } else {
                encoder.send_eof().unwrap();
            }
            let mut packet = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                packet.write_interleaved(&mut octx).unwrap();
            }
        }
        octx.write_trailer().unwrap();
    }

    fn acquired_camera(dir: &Path, frames: usize) -> (FfmpegCamera, CameraSettings) {
        let path = dir.join("camera.mp4");
        write_test_video(&path, frames, 160, 120, 30);
        let mut camera = FfmpegCamera::new(path.to_string_lossy());
        let settings = camera.acquire(&CameraConstraints::default()).unwrap();
        (camera, settings)
    }

    #[test]
    fn test_missing_source_is_unsupported() {
        let camera = FfmpegCamera::new("/nonexistent/video0");
        assert!(!camera.is_supported());
    }

    #[test]
    fn test_stream_urls_are_supported() {
        assert!(FfmpegCamera::new("rtsp://camera.local/stream").is_supported());
    }

    #[rstest]
    #[case("rtsp://camera.local/stream", SourceAddress::Url)]
    #[case("avfoundation:0", SourceAddress::Device { format: "avfoundation", device: "0" })]
    #[case(
        "dshow:video=USB Camera",
        SourceAddress::Device { format: "dshow", device: "video=USB Camera" }
    )]
    #[case("/dev/video0", SourceAddress::Path)]
    #[case("C:\\clips\\face.mp4", SourceAddress::Path)]
    #[case("clip.mp4", SourceAddress::Path)]
    fn test_parse_source(#[case] source: &str, #[case] expected: SourceAddress<'static>) {
        assert_eq!(parse_source(source), expected);
    }

    #[test]
    fn test_unknown_device_format_is_unsupported() {
        let camera = FfmpegCamera::new("nosuchgrabber:0");
        assert!(!camera.is_supported());
    }

    #[test]
    fn test_acquire_unknown_device_format_fails() {
        let mut camera = FfmpegCamera::new("nosuchgrabber:0");
        assert!(matches!(
            camera.acquire(&CameraConstraints::default()),
            Err(CameraError::Unsupported(_))
        ));
    }

    #[test]
    fn test_acquire_missing_source_fails() {
        let mut camera = FfmpegCamera::new("/nonexistent/video0");
        assert!(matches!(
            camera.acquire(&CameraConstraints::default()),
            Err(CameraError::Acquisition(_))
        ));
    }

    #[test]
    fn test_acquire_requires_video() {
        let mut camera = FfmpegCamera::new("/nonexistent/video0");
        assert!(matches!(
            camera.acquire(&CameraConstraints { video: false }),
            Err(CameraError::VideoNotRequested)
        ));
    }

    #[test]
    fn test_current_time_before_acquire_is_none() {
        let mut camera = FfmpegCamera::new("/nonexistent/video0");
        assert_eq!(camera.current_time(), None);
        assert!(camera.current_frame().is_none());
    }

    #[test]
    fn test_acquire_reports_settings() {
        let dir = tempfile::tempdir().unwrap();
        let (camera, settings) = acquired_camera(dir.path(), 3);
        assert!(camera.is_supported());
        assert_eq!(settings.width, 160);
        assert_eq!(settings.height, 120);
        assert!(settings.frame_rate > 0.0);
        assert!(!settings.codec.is_empty());
    }

    #[test]
    fn test_first_sample_presents_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut camera, _) = acquired_camera(dir.path(), 3);
        assert!(camera.current_time().is_some());
        let frame = camera.current_frame().unwrap();
        assert_eq!(frame.width(), 160);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data().len(), 160 * 120 * 3);
    }

    #[test]
    fn test_fast_polling_repeats_playback_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.mp4");
        write_test_video(&path, 3, 64, 48, 2);
        let mut camera = FfmpegCamera::new(path.to_string_lossy());
        camera.acquire(&CameraConstraints::default()).unwrap();

        let first = camera.current_time();
        let second = camera.current_time();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_stream_ends_after_last_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut camera, _) = acquired_camera(dir.path(), 3);
        assert!(camera.current_time().is_some());
        thread::sleep(Duration::from_millis(400));
        assert_eq!(camera.current_time(), None);
    }

    #[test]
    fn test_release_clears_presented_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut camera, _) = acquired_camera(dir.path(), 2);
        camera.current_time();
        camera.release();
        camera.release();
        assert!(camera.current_frame().is_none());
        assert_eq!(camera.current_time(), None);
    }
}
