/// Directory name used under the platform config and cache roots.
pub const APP_DIR_NAME: &str = "FaceCapture";

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Tick rate of the capture loop when no refresh rate is configured.
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

/// Frame duration assumed when a source does not report its frame rate.
pub const FALLBACK_FRAME_DURATION_SECS: f64 = 1.0 / 30.0;
