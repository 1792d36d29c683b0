use ndarray::{s, ArrayViewMut3};

use crate::overlay::domain::live_view::ContainerSize;
use crate::overlay::domain::overlay_node::OverlayNode;
use crate::shared::frame::Frame;

const DEFAULT_THICKNESS: usize = 2;
const LABEL_BAR_HEIGHT: f64 = 4.0;
const KEYPOINT_SIZE: f64 = 2.0 * crate::overlay::domain::overlay_renderer::KEYPOINT_CENTERING_PX;

/// Burns overlay nodes into a mirrored copy of a frame.
///
/// Nodes are in container pixels; they are scaled to the frame so the
/// output matches what the live view showed. Labels are drawn as a bar
/// since text rendering is out of reach here.
pub struct FrameAnnotator {
    box_color: [u8; 3],
    keypoint_color: [u8; 3],
    thickness: usize,
}

impl FrameAnnotator {
    pub fn new(box_color: [u8; 3], keypoint_color: [u8; 3], thickness: usize) -> Self {
        Self {
            box_color,
            keypoint_color,
            thickness: thickness.max(1),
        }
    }

    pub fn annotate(&self, frame: &Frame, nodes: &[OverlayNode], container: ContainerSize) -> Frame {
        let mut out = frame.mirrored();
        if out.channels() != 3 || container.width <= 0.0 || container.height <= 0.0 {
            return out;
        }
        let sx = frame.width() as f64 / container.width;
        let sy = frame.height() as f64 / container.height;
        let t = self.thickness as f64;
        let mut pixels = out.as_ndarray_mut();

        for node in nodes {
            match node {
                OverlayNode::Highlighter {
                    left,
                    top,
                    width,
                    height,
                } => {
                    let (x0, y0) = (left * sx, top * sy);
                    let (x1, y1) = ((left + width) * sx, (top + height) * sy);
                    fill(&mut pixels, x0, y0, x1, y0 + t, self.box_color);
                    fill(&mut pixels, x0, y1 - t, x1, y1, self.box_color);
                    fill(&mut pixels, x0, y0, x0 + t, y1, self.box_color);
                    fill(&mut pixels, x1 - t, y0, x1, y1, self.box_color);
                }
                OverlayNode::Label {
                    left, top, width, ..
                } => {
                    let (x0, y0) = (left * sx, top * sy);
                    fill(
                        &mut pixels,
                        x0,
                        y0,
                        (left + width) * sx,
                        y0 + LABEL_BAR_HEIGHT * sy,
                        self.box_color,
                    );
                }
                OverlayNode::KeyPoint { left, top } => {
                    let (x0, y0) = (left * sx, top * sy);
                    fill(
                        &mut pixels,
                        x0,
                        y0,
                        x0 + KEYPOINT_SIZE * sx,
                        y0 + KEYPOINT_SIZE * sy,
                        self.keypoint_color,
                    );
                }
            }
        }
        out
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new([255, 255, 255], [0, 200, 255], DEFAULT_THICKNESS)
    }
}

/// Fills `[x0, x1) x [y0, y1)`, clipped to the image.
fn fill(pixels: &mut ArrayViewMut3<'_, u8>, x0: f64, y0: f64, x1: f64, y1: f64, color: [u8; 3]) {
    let (h, w, _) = pixels.dim();
    let clamp = |v: f64, max: usize| (v.round().max(0.0) as usize).min(max);
    let (x0, x1) = (clamp(x0, w), clamp(x1, w));
    let (y0, y1) = (clamp(y0, h), clamp(y1, h));
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    for (c, value) in color.iter().enumerate() {
        pixels.slice_mut(s![y0..y1, x0..x1, c]).fill(*value);
    }
}
