use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::detection::domain::detector_options::{OptionsUpdate, RunningMode};
use crate::detection::domain::face_detector::FaceDetector;

use super::session_error::SessionError;

/// Outcome of building a detector, as delivered by a loader.
pub type LoadResult = Result<Box<dyn FaceDetector>, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready,
    Failed(String),
}

enum Slot {
    Loading(Receiver<LoadResult>),
    Ready(Box<dyn FaceDetector>),
    Failed(String),
}

/// The single detector instance shared by the demo.
///
/// Starts out loading; the loader's result is picked up by [`poll`] or
/// [`wait`]. Streaming access switches the detector from IMAGE to VIDEO
/// mode once, before the first video detection.
///
/// [`poll`]: Self::poll
/// [`wait`]: Self::wait
pub struct DetectorSession {
    slot: Slot,
}

impl DetectorSession {
    pub fn loading(results: Receiver<LoadResult>) -> Self {
        Self {
            slot: Slot::Loading(results),
        }
    }

    pub fn ready(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            slot: Slot::Ready(detector),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            slot: Slot::Failed(reason.into()),
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.slot {
            Slot::Loading(_) => SessionState::Loading,
            Slot::Ready(_) => SessionState::Ready,
            Slot::Failed(reason) => SessionState::Failed(reason.clone()),
        }
    }

    /// Picks up a finished load without blocking.
    pub fn poll(&mut self) -> SessionState {
        let received = match &self.slot {
            Slot::Loading(rx) => match rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(LOADER_GONE.to_string())),
            },
            _ => None,
        };
        if let Some(result) = received {
            self.settle(result);
        }
        self.state()
    }

    /// Blocks up to `timeout` for a pending load to finish.
    pub fn wait(&mut self, timeout: Duration) -> SessionState {
        let received = match &self.slot {
            Slot::Loading(rx) => match rx.recv_timeout(timeout) {
                Ok(result) => Some(result),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(Err(LOADER_GONE.to_string())),
            },
            _ => None,
        };
        if let Some(result) = received {
            self.settle(result);
        }
        self.state()
    }

    /// Running mode of the loaded detector.
    pub fn mode(&self) -> Option<RunningMode> {
        match &self.slot {
            Slot::Ready(detector) => Some(detector.running_mode()),
            _ => None,
        }
    }

    /// Errors unless the detector has loaded.
    pub fn require_ready(&mut self) -> Result<(), SessionError> {
        match self.poll() {
            SessionState::Ready => Ok(()),
            SessionState::Loading => Err(SessionError::StillLoading),
            SessionState::Failed(reason) => Err(SessionError::LoadFailed(reason)),
        }
    }

    /// The detector configured for per-frame video detection.
    pub fn streaming_detector(&mut self) -> Result<&mut dyn FaceDetector, SessionError> {
        self.require_ready()?;
        let Slot::Ready(detector) = &mut self.slot else {
            return Err(SessionError::StillLoading);
        };
        if detector.running_mode() == RunningMode::Image {
            detector
                .set_options(&OptionsUpdate::running_mode(RunningMode::Video))
                .map_err(SessionError::ModeSwitch)?;
            log::info!("Face detector switched to {} mode", RunningMode::Video);
        }
        Ok(detector.as_mut())
    }

    fn settle(&mut self, result: LoadResult) {
        self.slot = match result {
            Ok(detector) => {
                log::info!("Face detector loaded in {} mode", detector.running_mode());
                Slot::Ready(detector)
            }
            Err(reason) => {
                log::error!("Face detector failed to load: {reason}");
                Slot::Failed(reason)
            }
        };
    }
}

const LOADER_GONE: &str = "detector loader exited without a result";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_error::DetectionError;
    use crate::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
    use crate::shared::frame::Frame;
    use std::collections::HashMap;

    fn replay() -> Box<dyn FaceDetector> {
        Box::new(ReplayFaceDetector::new(HashMap::new(), Vec::new()))
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 12], 2, 2, 3, 0)
    }

    /// Refuses to leave IMAGE mode.
    struct StuckDetector;

    impl FaceDetector for StuckDetector {
        fn running_mode(&self) -> RunningMode {
            RunningMode::Image
        }

        fn set_options(&mut self, _: &OptionsUpdate) -> Result<(), DetectionError> {
            Err(DetectionError::InvalidOption("mode is fixed".into()))
        }

        fn detect(&mut self, _: &Frame) -> Result<Vec<crate::shared::detection::Detection>, DetectionError> {
            Ok(Vec::new())
        }

        fn detect_for_video(
            &mut self,
            _: &Frame,
            _: f64,
        ) -> Result<Vec<crate::shared::detection::Detection>, DetectionError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_loading_session_rejects_streaming() {
        let (_tx, rx) = crossbeam_channel::bounded::<LoadResult>(1);
        let mut session = DetectorSession::loading(rx);
        assert_eq!(session.poll(), SessionState::Loading);
        assert!(matches!(
            session.streaming_detector(),
            Err(SessionError::StillLoading)
        ));
        assert_eq!(
            SessionError::StillLoading.to_string(),
            "Face Detector is still loading. Please try again.."
        );
    }

    #[test]
    fn test_poll_picks_up_loaded_detector() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut session = DetectorSession::loading(rx);
        tx.send(Ok(replay())).unwrap();
        assert_eq!(session.poll(), SessionState::Ready);
        assert_eq!(session.mode(), Some(RunningMode::Image));
    }

    #[test]
    fn test_wait_times_out_while_loading() {
        let (_tx, rx) = crossbeam_channel::bounded::<LoadResult>(1);
        let mut session = DetectorSession::loading(rx);
        assert_eq!(
            session.wait(Duration::from_millis(10)),
            SessionState::Loading
        );
    }

    #[test]
    fn test_dropped_loader_fails_session() {
        let (tx, rx) = crossbeam_channel::bounded::<LoadResult>(1);
        let mut session = DetectorSession::loading(rx);
        drop(tx);
        assert!(matches!(session.poll(), SessionState::Failed(_)));
        assert!(matches!(
            session.require_ready(),
            Err(SessionError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_load_error_is_reported() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut session = DetectorSession::loading(rx);
        tx.send(Err("model not found".to_string())).unwrap();
        assert_eq!(
            session.wait(Duration::from_secs(1)),
            SessionState::Failed("model not found".into())
        );
    }

    #[test]
    fn test_streaming_switches_to_video_once() {
        let mut session = DetectorSession::ready(replay());
        assert_eq!(session.mode(), Some(RunningMode::Image));

        let detector = session.streaming_detector().unwrap();
        assert_eq!(detector.running_mode(), RunningMode::Video);
        detector.detect_for_video(&frame(), 10.0).unwrap();

        // A second switch would reset the timestamp sequence.
        let detector = session.streaming_detector().unwrap();
        assert!(detector.detect_for_video(&frame(), 5.0).is_err());
        assert_eq!(session.mode(), Some(RunningMode::Video));
    }

    #[test]
    fn test_failed_mode_switch_is_surfaced() {
        let mut session = DetectorSession::ready(Box::new(StuckDetector));
        assert!(matches!(
            session.streaming_detector(),
            Err(SessionError::ModeSwitch(_))
        ));
    }
}
