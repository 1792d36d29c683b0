use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use facecapture_core::camera::infrastructure::ffmpeg_camera::FfmpegCamera;
use facecapture_core::capture::domain::captured_image::StillEncoder;
use facecapture_core::capture::infrastructure::interval_frame_clock::IntervalFrameClock;
use facecapture_core::capture::infrastructure::png_still_encoder::PngStillEncoder;
use facecapture_core::config::demo_config::DemoConfig;
use facecapture_core::detection::domain::face_detector::FaceDetector;
use facecapture_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facecapture_core::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
use facecapture_core::overlay::domain::live_view::{ContainerSize, LiveView};
use facecapture_core::overlay::infrastructure::frame_annotator::FrameAnnotator;
use facecapture_core::overlay::infrastructure::retained_view::RetainedView;
use facecapture_core::pipeline::frame_logger::StdoutFrameLogger;
use facecapture_core::pipeline::live_demo::{FrameAction, FrameReport, LiveDemo};
use facecapture_core::quality::domain::quality_gate::QualityGate;
use facecapture_core::session::domain::detector_session::{DetectorSession, SessionState};
use facecapture_core::session::infrastructure::background_loader::spawn_loader;

/// Live face detection with quality-gated still capture.
#[derive(Parser)]
#[command(name = "facecapture")]
struct Cli {
    /// Camera device (`/dev/video0`, or `format:device` such as
    /// `avfoundation:0`), stream URL, or video file played as a camera.
    source: String,

    /// Face detection model: local path or http(s) URL.
    #[arg(long)]
    model: Option<String>,

    /// Directory checked for the model before downloading it.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Replay recorded detections (JSON) instead of running a model.
    #[arg(long, conflicts_with = "model")]
    detections: Option<PathBuf>,

    /// Settings file (default: FaceCapture/settings.json in the config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save_config: bool,

    /// Inference hardware: gpu or cpu.
    #[arg(long)]
    delegate: Option<String>,

    /// Minimum detection confidence (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Lowest face score percentage that allows capture.
    #[arg(long)]
    min_score: Option<i64>,

    /// Narrowest face box, in camera pixels, that allows capture.
    #[arg(long)]
    min_face_width: Option<f64>,

    /// Most faces allowed in frame for capture.
    #[arg(long)]
    max_faces: Option<usize>,

    /// Capture loop tick rate in Hz.
    #[arg(long)]
    refresh_hz: Option<f64>,

    /// Live view width in pixels (default: camera width).
    #[arg(long, requires = "container_height")]
    container_width: Option<f64>,

    /// Live view height in pixels (default: camera height).
    #[arg(long, requires = "container_width")]
    container_height: Option<f64>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Save a PNG still once a frame passes the quality gate, then stop.
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Print the captured still as a data URL.
    #[arg(long, requires = "capture")]
    print_data_url: bool,

    /// Write every processed frame with its overlays to this directory.
    #[arg(long)]
    annotate_dir: Option<PathBuf>,

    /// Print one JSON line per processed frame.
    #[arg(long)]
    json: bool,

    /// Seconds to wait for the face detector to load.
    #[arg(long, default_value = "120")]
    load_timeout: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => DemoConfig::default_path()?,
    };
    let mut config = DemoConfig::load_or_default(&config_path)?;
    apply_overrides(&mut config, &cli)?;
    config.validate()?;
    validate(&cli, &config)?;
    if cli.save_config {
        config.save(&config_path)?;
        log::info!("Settings saved to {}", config_path.display());
    }

    let view = RetainedView::new(config.container.unwrap_or(ContainerSize::new(0.0, 0.0)));
    let mut demo = LiveDemo::new(
        start_session(&cli, &config),
        Box::new(FfmpegCamera::new(cli.source.clone())),
        view,
        QualityGate::new(config.quality.clone()),
        Box::new(PngStillEncoder::new()),
        Box::new(StdoutFrameLogger::default()),
    );

    log::info!("Loading face detector...");
    match demo.wait_for_session(Duration::from_secs(cli.load_timeout)) {
        SessionState::Ready => {}
        SessionState::Loading => {
            return Err(format!(
                "Face detector did not load within {}s",
                cli.load_timeout
            )
            .into())
        }
        SessionState::Failed(reason) => {
            return Err(format!("Face detector failed to load: {reason}").into())
        }
    }

    let settings = demo.enable_camera()?;
    if config.container.is_none() {
        demo.view_mut().resize(ContainerSize::new(
            settings.width as f64,
            settings.height as f64,
        ));
    }
    let container = demo.view().container_size();

    let cancelled = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&cancelled))?;

    if let Some(secs) = cli.duration {
        cancel_after(Duration::from_secs_f64(secs), Arc::clone(&cancelled))?;
    }
    let annotator = FrameAnnotator::default();
    let mut capture_requested = false;
    let mut clock = IntervalFrameClock::new(config.refresh_hz);

    let summary = demo.run(&mut clock, &cancelled, |report| {
        if cli.json {
            print_frame_line(report);
        }
        if let Some(dir) = &cli.annotate_dir {
            if let Err(e) = write_annotated(&annotator, report, container, dir) {
                log::warn!("Failed to write annotated frame {}: {e}", report.frame.index());
            }
        }
        if capture_requested {
            return FrameAction::Stop;
        }
        if cli.capture.is_some() && report.capture_enabled {
            capture_requested = true;
            return FrameAction::Capture;
        }
        FrameAction::Continue
    })?;
    demo.shutdown();

    log::info!(
        "Processed {} frames ({} ticks, {} skipped, {} failed)",
        summary.processed,
        summary.ticks,
        summary.skipped,
        summary.failed
    );

    if let Some(path) = &cli.capture {
        match summary.captures.last() {
            Some(image) => {
                image.save(path)?;
                log::info!("Still written to {}", path.display());
                if cli.print_data_url {
                    println!("{}", image.data_url());
                }
            }
            None => log::warn!("No frame passed the quality gate; nothing captured"),
        }
    }

    Ok(())
}

fn start_session(cli: &Cli, config: &DemoConfig) -> DetectorSession {
    if let Some(path) = cli.detections.clone() {
        log::info!("Replaying detections from {}", path.display());
        return spawn_loader(move || {
            let detector = ReplayFaceDetector::from_json_file(&path)?;
            Ok(Box::new(detector) as Box<dyn FaceDetector>)
        });
    }

    let options = config.detector.clone();
    let models_dir = cli.models_dir.clone();
    spawn_loader(move || {
        let detector = OnnxBlazefaceDetector::create_from_options(
            &options,
            models_dir.as_deref(),
            Some(Box::new(download_progress)),
        )?;
        Ok(Box::new(detector) as Box<dyn FaceDetector>)
    })
}

fn apply_overrides(config: &mut DemoConfig, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(model) = &cli.model {
        config.detector.model_asset_path = model.clone();
    }
    if let Some(delegate) = &cli.delegate {
        config.detector.delegate = delegate.parse()?;
    }
    if let Some(confidence) = cli.confidence {
        config.detector.min_detection_confidence = confidence;
    }
    if let Some(score) = cli.min_score {
        config.quality.min_score_percent = score;
    }
    if let Some(width) = cli.min_face_width {
        config.quality.min_face_width = width;
    }
    if let Some(max_faces) = cli.max_faces {
        config.quality.max_faces = max_faces;
    }
    if let Some(hz) = cli.refresh_hz {
        config.refresh_hz = hz;
    }
    if let (Some(width), Some(height)) = (cli.container_width, cli.container_height) {
        config.container = Some(ContainerSize::new(width, height));
    }
    Ok(())
}

/// Raises the cancel flag once `after` has elapsed, whether or not
/// frames are still arriving.
fn cancel_after(after: Duration, cancelled: Arc<AtomicBool>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("duration-timer".into())
        .spawn(move || {
            thread::sleep(after);
            cancelled.store(true, Ordering::Relaxed);
        })
        .map(|_| ())
}

fn validate(cli: &Cli, config: &DemoConfig) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.detections {
        Some(path) if !path.exists() => {
            return Err(format!("Detections file not found: {}", path.display()).into());
        }
        None if config.detector.model_asset_path.trim().is_empty() => {
            return Err(
                "No face detection model configured: pass --model or --detections, \
                 or set detector.model_asset_path in the settings file"
                    .into(),
            );
        }
        _ => {}
    }
    if let Some(secs) = cli.duration {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(format!("Duration must be positive, got {secs}").into());
        }
    }
    if cli.load_timeout == 0 {
        return Err("Load timeout must be at least 1 second".into());
    }
    Ok(())
}

fn print_frame_line(report: &FrameReport<'_>) {
    let line = serde_json::json!({
        "frame": report.frame.index(),
        "time": report.frame.timestamp(),
        "detections": report.processed.detections,
        "verdict": report.processed.verdict,
        "captureEnabled": report.capture_enabled,
    });
    println!("{line}");
}

fn write_annotated(
    annotator: &FrameAnnotator,
    report: &FrameReport<'_>,
    container: ContainerSize,
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let annotated = annotator.annotate(report.frame, &report.processed.nodes, container);
    let still = PngStillEncoder::new().encode(&annotated)?;
    still.save(&dir.join(format!("frame_{:06}.png", report.frame.index())))?;
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
