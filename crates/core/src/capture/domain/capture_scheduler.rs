use crate::camera::domain::frame_source::FrameSource;
use crate::session::domain::detector_session::DetectorSession;
use crate::shared::detection::Detection;

/// What one tick of the capture loop did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The source stopped producing frames.
    Ended,
    /// Playback time has not moved since the last processed frame.
    Skipped,
    /// Detection failed; the frame is dropped and the loop carries on.
    Failed,
    Detected(Vec<Detection>),
}

/// Runs detection at most once per presented frame.
///
/// Ticks may arrive faster than the source presents frames; a tick whose
/// playback time equals the last processed one does no work.
#[derive(Debug, Default)]
pub struct CaptureScheduler {
    last_video_time: Option<f64>,
}

impl CaptureScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_video_time(&self) -> Option<f64> {
        self.last_video_time
    }

    /// Forget the last processed frame, e.g. after re-acquiring a camera.
    pub fn reset(&mut self) {
        self.last_video_time = None;
    }

    pub fn tick(
        &mut self,
        source: &mut dyn FrameSource,
        session: &mut DetectorSession,
        now_ms: f64,
    ) -> TickOutcome {
        let Some(video_time) = source.current_time() else {
            return TickOutcome::Ended;
        };
        if self.last_video_time == Some(video_time) {
            return TickOutcome::Skipped;
        }
        self.last_video_time = Some(video_time);

        let Some(frame) = source.current_frame() else {
            log::warn!("No frame presented at {video_time:.3}s");
            return TickOutcome::Failed;
        };
        let detector = match session.streaming_detector() {
            Ok(detector) => detector,
            Err(e) => {
                log::warn!("Skipping frame at {video_time:.3}s: {e}");
                return TickOutcome::Failed;
            }
        };
        match detector.detect_for_video(frame, now_ms) {
            Ok(detections) => TickOutcome::Detected(detections),
            Err(e) => {
                log::warn!("Detection failed for frame at {video_time:.3}s: {e}");
                TickOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detector_options::RunningMode;
    use crate::test_support::{face, ScriptedDetector, ScriptedSource};

    #[test]
    fn test_duplicate_playback_time_skips_detection() {
        let mut source = ScriptedSource::new(&[0.0, 0.0, 0.0, 0.033]);
        let detector = ScriptedDetector::new(vec![Ok(vec![face(0.9, 160.0)])]);
        let calls = detector.calls();
        let mut session = DetectorSession::ready(Box::new(detector));
        let mut scheduler = CaptureScheduler::new();

        let outcomes: Vec<_> = (0..4)
            .map(|i| scheduler.tick(&mut source, &mut session, 16.0 * (i + 1) as f64))
            .collect();

        assert!(matches!(outcomes[0], TickOutcome::Detected(_)));
        assert_eq!(outcomes[1], TickOutcome::Skipped);
        assert_eq!(outcomes[2], TickOutcome::Skipped);
        assert!(matches!(outcomes[3], TickOutcome::Detected(_)));
        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(scheduler.last_video_time(), Some(0.033));
    }

    #[test]
    fn test_first_tick_switches_session_to_video() {
        let mut source = ScriptedSource::new(&[0.0]);
        let mut session = DetectorSession::ready(Box::new(ScriptedDetector::new(vec![])));
        assert_eq!(session.mode(), Some(RunningMode::Image));

        CaptureScheduler::new().tick(&mut source, &mut session, 1.0);
        assert_eq!(session.mode(), Some(RunningMode::Video));
    }

    #[test]
    fn test_detection_receives_tick_timestamp() {
        let mut source = ScriptedSource::new(&[0.0, 0.04]);
        let detector = ScriptedDetector::new(vec![]);
        let calls = detector.calls();
        let mut session = DetectorSession::ready(Box::new(detector));
        let mut scheduler = CaptureScheduler::new();

        scheduler.tick(&mut source, &mut session, 100.5);
        scheduler.tick(&mut source, &mut session, 117.2);
        assert_eq!(*calls.lock().unwrap(), vec![100.5, 117.2]);
    }

    #[test]
    fn test_failed_frame_does_not_stop_the_loop() {
        let mut source = ScriptedSource::new(&[0.0, 0.033, 0.066]);
        let detector = ScriptedDetector::new(vec![
            Ok(vec![]),
            Err("inference failed".into()),
            Ok(vec![face(0.9, 160.0)]),
        ]);
        let mut session = DetectorSession::ready(Box::new(detector));
        let mut scheduler = CaptureScheduler::new();

        assert_eq!(
            scheduler.tick(&mut source, &mut session, 1.0),
            TickOutcome::Detected(vec![])
        );
        assert_eq!(
            scheduler.tick(&mut source, &mut session, 2.0),
            TickOutcome::Failed
        );
        assert!(matches!(
            scheduler.tick(&mut source, &mut session, 3.0),
            TickOutcome::Detected(d) if d.len() == 1
        ));
    }

    #[test]
    fn test_loading_session_skips_frame() {
        let (_tx, rx) = crossbeam_channel::bounded(1);
        let mut session = DetectorSession::loading(rx);
        let mut source = ScriptedSource::new(&[0.0]);
        assert_eq!(
            CaptureScheduler::new().tick(&mut source, &mut session, 1.0),
            TickOutcome::Failed
        );
    }

    #[test]
    fn test_end_of_stream() {
        let mut source = ScriptedSource::new(&[0.0]);
        let mut session = DetectorSession::ready(Box::new(ScriptedDetector::new(vec![])));
        let mut scheduler = CaptureScheduler::new();
        scheduler.tick(&mut source, &mut session, 1.0);
        assert_eq!(
            scheduler.tick(&mut source, &mut session, 2.0),
            TickOutcome::Ended
        );
    }

    #[test]
    fn test_reset_reprocesses_same_time() {
        let mut source = ScriptedSource::new(&[0.5, 0.5]);
        let mut session = DetectorSession::ready(Box::new(ScriptedDetector::new(vec![])));
        let mut scheduler = CaptureScheduler::new();
        scheduler.tick(&mut source, &mut session, 1.0);
        scheduler.reset();
        assert!(matches!(
            scheduler.tick(&mut source, &mut session, 2.0),
            TickOutcome::Detected(_)
        ));
    }
}
