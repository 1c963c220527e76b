//! Guide stroke styling and a backend-free overlay recorder.

use drawdeck_core::snap::{GuidePainter, GuideStroke};
use kurbo::{Cap, Line, Stroke};
use peniko::Color;

/// Dashed, round-capped stroke for a guide line.
pub fn guide_stroke(style: &GuideStroke) -> Stroke {
    Stroke::new(style.width)
        .with_caps(Cap::Round)
        .with_dashes(0.0, style.dash)
}

/// Guide color with the overlay opacity applied.
pub fn guide_color(style: &GuideStroke) -> Color {
    style.color.with_alpha_factor(style.alpha).into()
}

/// One stroked guide, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideSegment {
    pub line: Line,
    pub style: GuideStroke,
}

/// Records guide segments without drawing them.
///
/// Useful for hosts that draw the overlay with their own toolkit, and for
/// inspecting what would be painted.
#[derive(Debug, Clone, Default)]
pub struct GuideOverlay {
    segments: Vec<GuideSegment>,
}

impl GuideOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[GuideSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl GuidePainter for GuideOverlay {
    fn clear(&mut self) {
        self.segments.clear();
    }

    fn stroke_line(&mut self, line: Line, stroke: &GuideStroke) {
        self.segments.push(GuideSegment {
            line,
            style: *stroke,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawdeck_core::canvas::Canvas;
    use drawdeck_core::scene::SelectionModel;
    use drawdeck_core::shapes::{SerializableColor, Shape};
    use drawdeck_core::snap::{AlignmentGuides, GUIDE_ALPHA, GUIDE_DASH};
    use kurbo::{Point, Rect};
    use std::time::Duration;

    fn style() -> GuideStroke {
        GuideStroke {
            color: SerializableColor::new(0x32, 0xD1, 0x0A, 255),
            width: 1.0,
            dash: GUIDE_DASH,
            alpha: GUIDE_ALPHA,
        }
    }

    #[test]
    fn test_stroke_is_dashed_and_round() {
        let stroke = guide_stroke(&style());
        assert_eq!(stroke.width, 1.0);
        assert_eq!(stroke.start_cap, Cap::Round);
        assert_eq!(stroke.end_cap, Cap::Round);
        assert_eq!(stroke.dash_pattern.as_slice(), &[8.0, 4.0]);
    }

    #[test]
    fn test_color_alpha() {
        let rgba = guide_color(&style()).to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b, rgba.a), (0x32, 0xD1, 0x0A, 230));
    }

    #[test]
    fn test_overlay_records_guides() {
        let mut canvas = Canvas::new();
        canvas.set_canvas_size(2000.0, 2000.0);
        canvas.add_shape(Shape::rectangle(Rect::new(100.0, 100.0, 150.0, 150.0)));
        let moving = canvas.add_shape(Shape::rectangle(Rect::from_origin_size(
            Point::new(102.0, 300.0),
            (30.0, 30.0),
        )));
        canvas.set_selection(&[moving]);

        let mut guides = AlignmentGuides::default();
        guides.handle_object_moving(&mut canvas, moving, Duration::ZERO);

        let mut overlay = GuideOverlay::new();
        guides.render(&canvas, &mut overlay);
        assert!(!overlay.is_empty());
        assert!(overlay.segments().iter().all(|s| s.line.p0.x == 100.5));

        guides.handle_pointer_up();
        guides.render(&canvas, &mut overlay);
        assert!(overlay.is_empty());
    }
}
