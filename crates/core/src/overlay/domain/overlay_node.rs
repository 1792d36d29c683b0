use serde::Serialize;

/// An absolutely positioned element layered over the live view.
///
/// Coordinates are container pixels in the mirrored presentation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayNode {
    /// Rectangle outlining a detected face.
    Highlighter {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    /// Score caption placed just above the highlighter.
    Label {
        left: f64,
        top: f64,
        width: f64,
        text: String,
    },
    /// Small marker centred on an eye keypoint.
    KeyPoint { left: f64, top: f64 },
}

impl OverlayNode {
    pub fn class_name(&self) -> &'static str {
        match self {
            OverlayNode::Highlighter { .. } => "highlighter",
            OverlayNode::Label { .. } => "label",
            OverlayNode::KeyPoint { .. } => "key-point",
        }
    }

    pub fn left(&self) -> f64 {
        match self {
            OverlayNode::Highlighter { left, .. }
            | OverlayNode::Label { left, .. }
            | OverlayNode::KeyPoint { left, .. } => *left,
        }
    }

    pub fn top(&self) -> f64 {
        match self {
            OverlayNode::Highlighter { top, .. }
            | OverlayNode::Label { top, .. }
            | OverlayNode::KeyPoint { top, .. } => *top,
        }
    }

    /// Inline style positioning the node, e.g. `left: 12px;top: 40px;`.
    pub fn style(&self) -> String {
        match self {
            OverlayNode::Highlighter {
                left,
                top,
                width,
                height,
            } => format!("left: {left}px;top: {top}px;width: {width}px;height: {height}px;"),
            OverlayNode::Label {
                left, top, width, ..
            } => format!("left: {left}px;top: {top}px;width: {width}px;"),
            OverlayNode::KeyPoint { left, top } => format!("left: {left}px;top: {top}px;"),
        }
    }
}
