use std::collections::BTreeMap;

use serde::Serialize;

use crate::overlay::domain::live_view::{ContainerSize, LiveView, NodeHandle, ViewError};
use crate::overlay::domain::overlay_node::OverlayNode;

/// In-memory view tree.
///
/// Holds what a page would display so headless runs can report it and
/// tests can inspect it. The capture control starts disabled.
#[derive(Debug, Clone)]
pub struct RetainedView {
    container: ContainerSize,
    nodes: BTreeMap<NodeHandle, OverlayNode>,
    next_id: u64,
    capture_enabled: bool,
    instruction: String,
    instruction_visible: bool,
    controls_visible: bool,
    enable_camera_visible: bool,
    enable_camera_enabled: bool,
    last_alert: Option<String>,
}

/// Serializable state of a [`RetainedView`] at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub container: ContainerSize,
    pub nodes: Vec<OverlayNode>,
    pub capture_enabled: bool,
    pub instruction: Option<String>,
    pub controls_visible: bool,
}

impl RetainedView {
    pub fn new(container: ContainerSize) -> Self {
        Self {
            container,
            nodes: BTreeMap::new(),
            next_id: 0,
            capture_enabled: false,
            instruction: String::new(),
            instruction_visible: false,
            controls_visible: true,
            enable_camera_visible: true,
            enable_camera_enabled: true,
            last_alert: None,
        }
    }

    pub fn resize(&mut self, container: ContainerSize) {
        self.container = container;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &OverlayNode> {
        self.nodes.values()
    }

    /// Detaches every node, as a page reload would.
    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
    }

    /// The instruction text, if currently shown.
    pub fn instruction(&self) -> Option<&str> {
        self.instruction_visible.then_some(self.instruction.as_str())
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn enable_camera_visible(&self) -> bool {
        self.enable_camera_visible
    }

    pub fn enable_camera_enabled(&self) -> bool {
        self.enable_camera_enabled
    }

    pub fn last_alert(&self) -> Option<&str> {
        self.last_alert.as_deref()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            container: self.container,
            nodes: self.nodes.values().cloned().collect(),
            capture_enabled: self.capture_enabled,
            instruction: self.instruction().map(str::to_string),
            controls_visible: self.controls_visible,
        }
    }
}

impl LiveView for RetainedView {
    fn container_size(&self) -> ContainerSize {
        self.container
    }

    fn append(&mut self, node: OverlayNode) -> NodeHandle {
        let handle = NodeHandle::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(handle, node);
        handle
    }

    fn remove(&mut self, handle: NodeHandle) -> Result<(), ViewError> {
        self.nodes
            .remove(&handle)
            .map(|_| ())
            .ok_or(ViewError::UnknownNode(handle))
    }

    fn capture_enabled(&self) -> bool {
        self.capture_enabled
    }

    fn set_capture_enabled(&mut self, enabled: bool) {
        self.capture_enabled = enabled;
    }

    fn show_instruction(&mut self, message: &str) {
        self.instruction = message.to_string();
        self.instruction_visible = true;
    }

    fn hide_instruction(&mut self) {
        self.instruction_visible = false;
    }

    fn set_controls_visible(&mut self, visible: bool) {
        self.controls_visible = visible;
    }

    fn set_enable_camera_visible(&mut self, visible: bool) {
        self.enable_camera_visible = visible;
    }

    fn set_enable_camera_enabled(&mut self, enabled: bool) {
        self.enable_camera_enabled = enabled;
    }

    fn alert(&mut self, message: &str) {
        log::warn!("{message}");
        self.last_alert = Some(message.to_string());
    }
}
