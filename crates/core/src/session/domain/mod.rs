pub mod detector_session;
pub mod session_error;
