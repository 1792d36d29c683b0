use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::overlay_node::OverlayNode;

/// Identifies a node appended to a [`LiveView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Rendered size of the live-view container in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("node {} is not attached to the view", .0.id())]
    UnknownNode(NodeHandle),
}

/// The page surface the demo draws into: an overlay layer on top of the
/// video plus the handful of controls the demo toggles.
pub trait LiveView {
    fn container_size(&self) -> ContainerSize;

    fn append(&mut self, node: OverlayNode) -> NodeHandle;

    fn remove(&mut self, handle: NodeHandle) -> Result<(), ViewError>;

    fn capture_enabled(&self) -> bool;

    fn set_capture_enabled(&mut self, enabled: bool);

    fn show_instruction(&mut self, message: &str);

    fn hide_instruction(&mut self);

    /// Controls stay hidden until the detector has loaded.
    fn set_controls_visible(&mut self, visible: bool);

    fn set_enable_camera_visible(&mut self, visible: bool);

    fn set_enable_camera_enabled(&mut self, enabled: bool);

    /// Blocking notice, shown when an action is attempted too early.
    fn alert(&mut self, message: &str);
}
