pub mod detection_error;
pub mod detector_options;
pub mod face_detector;
