use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::camera::domain::camera_error::CameraError;
use crate::camera::domain::frame_source::{CameraConstraints, CameraSettings, FrameSource};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::capture_scheduler::{CaptureScheduler, TickOutcome};
use crate::capture::domain::captured_image::{CapturedImage, StillEncoder};
use crate::capture::domain::frame_clock::FrameClock;
use crate::overlay::domain::live_view::LiveView;
use crate::overlay::domain::overlay_node::OverlayNode;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::quality::domain::quality_gate::{QualityGate, QualityVerdict};
use crate::session::domain::detector_session::{DetectorSession, SessionState};
use crate::session::domain::session_error::SessionError;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::frame_logger::FrameLogger;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("camera has not been enabled")]
    CameraNotEnabled,
}

/// Result of one processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedFrame {
    pub detections: Vec<Detection>,
    pub nodes: Vec<OverlayNode>,
    pub verdict: QualityVerdict,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Ended,
    Skipped,
    Failed,
    Processed(ProcessedFrame),
}

/// Handed to the run loop's callback after each processed frame.
pub struct FrameReport<'a> {
    pub frame: &'a Frame,
    pub processed: &'a ProcessedFrame,
    pub capture_enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAction {
    Continue,
    /// Take a still of the current frame if the gate allows it.
    Capture,
    Stop,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub ticks: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub captures: Vec<CapturedImage>,
    /// True when the source ran out, false when stopped or cancelled.
    pub ended: bool,
}

/// The webcam face-detection demo: a detector session, a camera, and a
/// view that shows overlays and gates still capture on face quality.
///
/// Controls stay hidden until the detector has loaded. Enabling the camera
/// is refused while loading. Each processed frame replaces the overlays,
/// then the quality verdict toggles the capture control.
pub struct LiveDemo<V: LiveView> {
    session: DetectorSession,
    source: Box<dyn FrameSource>,
    view: V,
    renderer: OverlayRenderer,
    gate: QualityGate,
    scheduler: CaptureScheduler,
    encoder: Box<dyn StillEncoder>,
    logger: Box<dyn FrameLogger>,
    camera_active: bool,
    controls_shown: bool,
}

impl<V: LiveView> LiveDemo<V> {
    pub fn new(
        session: DetectorSession,
        source: Box<dyn FrameSource>,
        mut view: V,
        gate: QualityGate,
        encoder: Box<dyn StillEncoder>,
        logger: Box<dyn FrameLogger>,
    ) -> Self {
        view.set_controls_visible(false);
        let supported = source.is_supported();
        if !supported {
            log::warn!("Camera capture is not supported for this source");
        }
        view.set_enable_camera_enabled(supported);

        let mut demo = Self {
            session,
            source,
            view,
            renderer: OverlayRenderer::new(),
            gate,
            scheduler: CaptureScheduler::new(),
            encoder,
            logger,
            camera_active: false,
            controls_shown: false,
        };
        demo.poll_session();
        demo
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn session(&self) -> &DetectorSession {
        &self.session
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn poll_session(&mut self) -> SessionState {
        let state = self.session.poll();
        self.reveal_controls(&state);
        state
    }

    pub fn wait_for_session(&mut self, timeout: Duration) -> SessionState {
        let state = self.session.wait(timeout);
        self.reveal_controls(&state);
        state
    }

    fn reveal_controls(&mut self, state: &SessionState) {
        if *state == SessionState::Ready && !self.controls_shown {
            self.view.set_controls_visible(true);
            self.controls_shown = true;
        }
    }

    /// Acquires the camera. Refused with an alert while the detector loads.
    pub fn enable_camera(&mut self) -> Result<CameraSettings, DemoError> {
        match self.poll_session() {
            SessionState::Ready => {}
            SessionState::Loading => {
                let err = SessionError::StillLoading;
                self.view.alert(&err.to_string());
                return Err(err.into());
            }
            SessionState::Failed(reason) => return Err(SessionError::LoadFailed(reason).into()),
        }
        if !self.source.is_supported() {
            return Err(CameraError::Unsupported("no camera available".into()).into());
        }

        self.view.set_enable_camera_visible(false);
        let settings = self
            .source
            .acquire(&CameraConstraints::default())
            .map_err(|e| {
                log::error!("Camera acquisition failed: {e}");
                e
            })?;
        log::info!("Camera specifications: {settings}");
        self.logger.info(&format!("Camera enabled: {settings}"));

        self.scheduler.reset();
        self.camera_active = true;
        Ok(settings)
    }

    /// One tick of the capture loop at `now_ms`.
    pub fn step(&mut self, now_ms: f64) -> Step {
        let detect_start = Instant::now();
        let detections = match self
            .scheduler
            .tick(self.source.as_mut(), &mut self.session, now_ms)
        {
            TickOutcome::Ended => return Step::Ended,
            TickOutcome::Skipped => return Step::Skipped,
            TickOutcome::Failed => return Step::Failed,
            TickOutcome::Detected(detections) => detections,
        };
        self.logger
            .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);

        let render_start = Instant::now();
        let nodes = self.renderer.render(&mut self.view, &detections);
        let verdict = self.gate.evaluate(&detections);
        self.gate.apply(&verdict, &mut self.view);
        self.logger
            .timing("render", render_start.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", detections.len() as f64);

        Step::Processed(ProcessedFrame {
            detections,
            nodes,
            verdict,
        })
    }

    /// Drives [`step`](Self::step) from `clock` until the source ends,
    /// `cancelled` is set, or the callback asks to stop.
    pub fn run<F>(
        &mut self,
        clock: &mut dyn FrameClock,
        cancelled: &AtomicBool,
        mut on_frame: F,
    ) -> Result<RunSummary, DemoError>
    where
        F: FnMut(&FrameReport<'_>) -> FrameAction,
    {
        if !self.camera_active {
            return Err(DemoError::CameraNotEnabled);
        }
        let mut summary = RunSummary::default();
        loop {
            if cancelled.load(Ordering::Relaxed) {
                log::info!("Capture loop cancelled");
                break;
            }
            let now_ms = clock.next_tick();
            summary.ticks += 1;

            let processed = match self.step(now_ms) {
                Step::Ended => {
                    summary.ended = true;
                    break;
                }
                Step::Skipped => {
                    summary.skipped += 1;
                    continue;
                }
                Step::Failed => {
                    summary.failed += 1;
                    continue;
                }
                Step::Processed(processed) => processed,
            };
            summary.processed += 1;
            self.logger.frame(summary.processed);

            let Some(frame) = self.source.current_frame() else {
                continue;
            };
            let action = on_frame(&FrameReport {
                frame,
                processed: &processed,
                capture_enabled: self.view.capture_enabled(),
            });
            match action {
                FrameAction::Continue => {}
                FrameAction::Capture => match self.capture_image() {
                    Ok(image) => summary.captures.push(image),
                    Err(e) => log::info!("Capture skipped: {e}"),
                },
                FrameAction::Stop => break,
            }
        }
        self.logger.summary();
        Ok(summary)
    }

    /// Encodes the presented frame, if the last verdict allowed capture.
    pub fn capture_image(&self) -> Result<CapturedImage, CaptureError> {
        if !self.view.capture_enabled() {
            return Err(CaptureError::NotPermitted);
        }
        let frame = self.source.current_frame().ok_or(CaptureError::NoFrame)?;
        let image = self.encoder.encode(frame)?;
        log::info!(
            "Captured {}x{} still ({} bytes)",
            image.width(),
            image.height(),
            image.png_bytes().len()
        );
        Ok(image)
    }

    /// Removes overlays and releases the camera.
    pub fn shutdown(&mut self) {
        self.renderer.clear(&mut self.view);
        self.view.set_capture_enabled(false);
        self.view.hide_instruction();
        if self.camera_active {
            self.source.release();
            self.camera_active = false;
        }
    }
}
