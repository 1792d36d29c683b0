pub mod interval_frame_clock;
pub mod png_still_encoder;
