//! Viewport pan/zoom for the reference scene.

use kurbo::{Affine, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the viewport transform of the canvas.
///
/// Scene coordinates map to screen coordinates through
/// `translate(offset) * scale(zoom)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
    /// Current zoom level (1.0 = 100%)
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }
}
