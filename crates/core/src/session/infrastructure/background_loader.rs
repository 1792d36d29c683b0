use std::thread;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::session::domain::detector_session::DetectorSession;

/// Builds the detector on a background thread and returns a session that
/// picks up the result once it arrives.
pub fn spawn_loader<F>(factory: F) -> DetectorSession
where
    F: FnOnce() -> Result<Box<dyn FaceDetector>, DetectionError> + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    let spawned = thread::Builder::new()
        .name("detector-loader".into())
        .spawn(move || {
            let result = factory().map_err(|e| e.to_string());
            // The session may already be gone; nothing left to notify.
            let _ = tx.send(result);
        });

    match spawned {
        Ok(_) => DetectorSession::loading(rx),
        Err(e) => DetectorSession::failed(format!("could not start loader thread: {e}")),
    }
}
