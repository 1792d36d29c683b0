pub mod live_view;
pub mod overlay_node;
pub mod overlay_renderer;
