pub mod capture_error;
pub mod capture_scheduler;
pub mod captured_image;
pub mod frame_clock;
