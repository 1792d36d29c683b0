pub mod frame_annotator;
pub mod retained_view;
