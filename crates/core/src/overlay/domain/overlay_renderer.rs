use crate::shared::detection::{BoundingBox, Detection, Keypoint};

use super::live_view::{ContainerSize, LiveView, NodeHandle};
use super::overlay_node::OverlayNode;

/// Margin taken off the box width so the border sits inside the face.
pub const HIGHLIGHT_INSET_PX: f64 = 10.0;
/// Vertical distance between the label and the top of its box.
pub const LABEL_OFFSET_PX: f64 = 30.0;
/// Half the marker size; keypoint markers are centred on the point.
pub const KEYPOINT_CENTERING_PX: f64 = 3.0;

/// Owns the overlay node set for the last processed frame.
///
/// Every [`render`](Self::render) first removes what the previous call
/// appended, so the view never holds overlays from more than one frame.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    nodes: Vec<NodeHandle>,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Replaces the displayed overlays with those for `detections` and
    /// returns the nodes appended.
    pub fn render(&mut self, view: &mut dyn LiveView, detections: &[Detection]) -> Vec<OverlayNode> {
        self.clear(view);
        let container = view.container_size();
        let nodes: Vec<OverlayNode> = detections
            .iter()
            .flat_map(|d| overlay_nodes(d, container))
            .collect();
        for node in &nodes {
            self.nodes.push(view.append(node.clone()));
        }
        nodes
    }

    pub fn clear(&mut self, view: &mut dyn LiveView) {
        for handle in self.nodes.drain(..) {
            if let Err(e) = view.remove(handle) {
                log::warn!("Overlay cleanup: {e}");
            }
        }
    }
}

/// Left edge of a box once the frame is shown mirrored.
pub fn mirrored_left(container_width: f64, bbox: &BoundingBox) -> f64 {
    container_width - bbox.width - bbox.origin_x
}

/// Marker position for a normalized keypoint in the mirrored view.
pub fn keypoint_position(keypoint: &Keypoint, container: ContainerSize) -> (f64, f64) {
    (
        container.width - keypoint.x * container.width - KEYPOINT_CENTERING_PX,
        keypoint.y * container.height - KEYPOINT_CENTERING_PX,
    )
}

/// Highlighter, label, then one marker per eye keypoint.
pub fn overlay_nodes(detection: &Detection, container: ContainerSize) -> Vec<OverlayNode> {
    let bbox = &detection.bounding_box;
    let left = mirrored_left(container.width, bbox);
    let width = bbox.width - HIGHLIGHT_INSET_PX;

    let mut nodes = vec![
        OverlayNode::Highlighter {
            left,
            top: bbox.origin_y,
            width,
            height: bbox.height,
        },
        OverlayNode::Label {
            left,
            top: bbox.origin_y - LABEL_OFFSET_PX,
            width,
            text: format!("Quality: {}% .", detection.score_percent()),
        },
    ];
    nodes.extend(detection.eye_keypoints().iter().map(|kp| {
        let (left, top) = keypoint_position(kp, container);
        OverlayNode::KeyPoint { left, top }
    }));
    nodes
}
