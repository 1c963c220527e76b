//! Vello-backed guide painter.

use crate::overlay::{guide_color, guide_stroke};
use drawdeck_core::snap::{GuidePainter, GuideStroke};
use kurbo::{Affine, Line};
use vello::Scene;

/// Paints guides into a dedicated Vello scene, composited above the canvas.
pub struct VelloGuidePainter {
    scene: Scene,
}

impl Default for VelloGuidePainter {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloGuidePainter {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
        }
    }

    /// The overlay scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Append the overlay on top of `target`.
    pub fn append_to(&self, target: &mut Scene) {
        target.append(&self.scene, None);
    }
}

impl GuidePainter for VelloGuidePainter {
    fn clear(&mut self) {
        self.scene.reset();
    }

    fn stroke_line(&mut self, line: Line, stroke: &GuideStroke) {
        // Lines arrive in screen space, already pixel aligned.
        self.scene.stroke(
            &guide_stroke(stroke),
            Affine::IDENTITY,
            guide_color(stroke),
            None,
            &line,
        );
    }
}
