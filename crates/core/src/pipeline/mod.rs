pub mod frame_logger;
pub mod live_demo;
