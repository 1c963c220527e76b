//! Alignment guides: snapping a dragged object to other objects' edges and
//! centers, and to the canvas center.
//!
//! Every admitted drag frame compares the five anchors of the moving object
//! against the five anchors of every other visible object, per axis. Matches
//! become guide lines and snap candidates; the candidate nearest the moving
//! object's center wins and is applied if the correction is small.

use crate::scene::{ObjectId, SceneGraph, SelectionModel};
use crate::scheduler::Throttle;
use crate::shapes::SerializableColor;
use kurbo::{Affine, Line, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default guide color.
pub const DEFAULT_LINE_COLOR: SerializableColor = SerializableColor {
    r: 0x32,
    g: 0xD1,
    b: 0x0A,
    a: 255,
};

/// Default snap distance in screen pixels.
pub const DEFAULT_LINE_MARGIN: f64 = 4.0;

/// Minimum time between processed drag frames (~60 FPS).
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Padding added past both objects' extents on a guide line.
pub const GUIDE_EXTENT_PADDING: f64 = 20.0;

/// Largest applied snap correction, as a multiple of the margin.
pub const MAX_SNAP_FACTOR: f64 = 1.5;

/// A guide is drawn only if an anchor of the moving object is this close.
pub const LINE_DRAW_TOLERANCE: f64 = 2.0;

/// Dash pattern of guide lines (on, off).
pub const GUIDE_DASH: [f64; 2] = [8.0, 4.0];

/// Opacity of guide lines.
pub const GUIDE_ALPHA: f64 = 0.9;

/// The five alignment points of an object's bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub tl: Point,
    pub tr: Point,
    pub bl: Point,
    pub br: Point,
    pub center: Point,
}

impl Anchors {
    pub fn from_bounds(bounds: Rect, center: Point) -> Self {
        Self {
            tl: Point::new(bounds.x0, bounds.y0),
            tr: Point::new(bounds.x1, bounds.y0),
            bl: Point::new(bounds.x0, bounds.y1),
            br: Point::new(bounds.x1, bounds.y1),
            center,
        }
    }

    /// Anchors of a scene object, if it exists.
    pub fn of<S: SceneGraph + ?Sized>(scene: &S, id: ObjectId) -> Option<Self> {
        let bounds = scene.bounds(id)?;
        let center = scene.center(id).unwrap_or_else(|| bounds.center());
        Some(Self::from_bounds(bounds, center))
    }

    pub fn points(&self) -> [Point; 5] {
        [self.tl, self.tr, self.bl, self.br, self.center]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// A line of constant x.
    Vertical,
    /// A line of constant y.
    Horizontal,
}

/// A guide line in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapLine {
    pub axis: Axis,
    /// x for vertical lines, y for horizontal ones.
    pub coordinate: f64,
    pub extent_start: f64,
    pub extent_end: f64,
}

impl SnapLine {
    pub fn vertical(x: f64, y1: f64, y2: f64) -> Self {
        Self {
            axis: Axis::Vertical,
            coordinate: x,
            extent_start: y1,
            extent_end: y2,
        }
    }

    pub fn horizontal(y: f64, x1: f64, x2: f64) -> Self {
        Self {
            axis: Axis::Horizontal,
            coordinate: y,
            extent_start: x1,
            extent_end: x2,
        }
    }

    pub fn endpoints(&self) -> (Point, Point) {
        match self.axis {
            Axis::Vertical => (
                Point::new(self.coordinate, self.extent_start),
                Point::new(self.coordinate, self.extent_end),
            ),
            Axis::Horizontal => (
                Point::new(self.extent_start, self.coordinate),
                Point::new(self.extent_end, self.coordinate),
            ),
        }
    }

    /// Whether any anchor lies within `tolerance` of the line.
    pub fn touches(&self, anchors: &Anchors, tolerance: f64) -> bool {
        anchors.points().iter().any(|p| {
            let value = match self.axis {
                Axis::Vertical => p.x,
                Axis::Horizontal => p.y,
            };
            (value - self.coordinate).abs() <= tolerance
        })
    }

    /// Map to screen space and align to the pixel grid.
    pub fn to_screen(&self, transform: Affine) -> Line {
        let (start, end) = self.endpoints();
        let (start, end) = (transform * start, transform * end);
        match self.axis {
            Axis::Vertical => Line::new(
                (start.x.round() + 0.5, start.y.round()),
                (end.x.round() + 0.5, end.y.round()),
            ),
            Axis::Horizontal => Line::new(
                (start.x.round(), start.y.round() + 0.5),
                (end.x.round(), end.y.round() + 0.5),
            ),
        }
    }
}

/// A snap target on one axis and the correction that reaches it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    /// Coordinate to align to.
    pub target: f64,
    /// Offset that puts the matching anchor of the moving object on `target`.
    pub delta: f64,
}

/// Guides and snap choice for one drag frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentFrame {
    pub vertical: Vec<SnapLine>,
    pub horizontal: Vec<SnapLine>,
    pub snap_x: Option<SnapCandidate>,
    pub snap_y: Option<SnapCandidate>,
}

impl AlignmentFrame {
    /// Correction to apply, dropping any axis whose delta exceeds
    /// `max_distance`.
    pub fn bounded_delta(&self, max_distance: f64) -> Vec2 {
        let pick = |candidate: Option<SnapCandidate>| match candidate {
            Some(c) if c.delta.abs() <= max_distance => c.delta,
            _ => 0.0,
        };
        Vec2::new(pick(self.snap_x), pick(self.snap_y))
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty() && self.horizontal.is_empty()
    }
}

/// Pick the candidate whose target is closest to `value`; first found wins
/// ties.
fn closest(value: f64, candidates: &[SnapCandidate]) -> Option<SnapCandidate> {
    candidates.iter().copied().reduce(|best, c| {
        if (value - c.target).abs() < (value - best.target).abs() {
            c
        } else {
            best
        }
    })
}

/// Compare `moving` against `others` and the canvas center.
///
/// `threshold` is the match distance in scene units (the screen margin
/// divided by the zoom).
pub fn compute_alignment(
    moving: &Anchors,
    others: &[Anchors],
    canvas: Size,
    threshold: f64,
) -> AlignmentFrame {
    let mut frame = AlignmentFrame::default();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let in_range = |a: f64, b: f64| (a - b).abs() <= threshold;

    for other in others {
        for m in moving.points() {
            for o in other.points() {
                if in_range(m.x, o.x) {
                    xs.push(SnapCandidate {
                        target: o.x,
                        delta: o.x - m.x,
                    });
                    frame.vertical.push(SnapLine::vertical(
                        o.x,
                        moving.tl.y.min(other.tl.y) - GUIDE_EXTENT_PADDING,
                        moving.br.y.max(other.br.y) + GUIDE_EXTENT_PADDING,
                    ));
                }
            }
        }
        for m in moving.points() {
            for o in other.points() {
                if in_range(m.y, o.y) {
                    ys.push(SnapCandidate {
                        target: o.y,
                        delta: o.y - m.y,
                    });
                    frame.horizontal.push(SnapLine::horizontal(
                        o.y,
                        moving.tl.x.min(other.tl.x) - GUIDE_EXTENT_PADDING,
                        moving.br.x.max(other.br.x) + GUIDE_EXTENT_PADDING,
                    ));
                }
            }
        }
    }

    let center = Point::new(canvas.width / 2.0, canvas.height / 2.0);
    if in_range(moving.center.x, center.x) {
        xs.push(SnapCandidate {
            target: center.x,
            delta: center.x - moving.center.x,
        });
        frame
            .vertical
            .push(SnapLine::vertical(center.x, 0.0, canvas.height));
    }
    if in_range(moving.center.y, center.y) {
        ys.push(SnapCandidate {
            target: center.y,
            delta: center.y - moving.center.y,
        });
        frame
            .horizontal
            .push(SnapLine::horizontal(center.y, 0.0, canvas.width));
    }

    frame.snap_x = closest(moving.center.x, &xs);
    frame.snap_y = closest(moving.center.y, &ys);
    frame
}

/// Guide appearance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideOptions {
    pub line_color: SerializableColor,
    pub line_width: f64,
    /// Snap distance in screen pixels.
    pub line_margin: f64,
    pub enabled: bool,
    pub frame_interval_ms: u64,
}

impl Default for GuideOptions {
    fn default() -> Self {
        Self {
            line_color: DEFAULT_LINE_COLOR,
            line_width: 1.0,
            line_margin: DEFAULT_LINE_MARGIN,
            enabled: true,
            frame_interval_ms: FRAME_INTERVAL_MS,
        }
    }
}

/// Partial update for [`GuideOptions`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuideOptionsUpdate {
    pub line_color: Option<SerializableColor>,
    pub line_width: Option<f64>,
    pub line_margin: Option<f64>,
    pub enabled: Option<bool>,
}

/// Stroke used for guide lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideStroke {
    pub color: SerializableColor,
    pub width: f64,
    pub dash: [f64; 2],
    pub alpha: f64,
}

/// Overlay surface the guides are painted on, above the scene.
pub trait GuidePainter {
    /// Erase everything painted so far.
    fn clear(&mut self);

    /// Stroke a line given in screen coordinates with round caps.
    fn stroke_line(&mut self, line: Line, stroke: &GuideStroke);
}

/// Drag-time alignment guides for one scene.
#[derive(Debug, Clone)]
pub struct AlignmentGuides {
    options: GuideOptions,
    vertical_lines: Vec<SnapLine>,
    horizontal_lines: Vec<SnapLine>,
    active_object: Option<ObjectId>,
    moving: bool,
    throttle: Throttle,
}

impl Default for AlignmentGuides {
    fn default() -> Self {
        Self::new(GuideOptions::default())
    }
}

impl AlignmentGuides {
    pub fn new(options: GuideOptions) -> Self {
        Self {
            options,
            vertical_lines: Vec::new(),
            horizontal_lines: Vec::new(),
            active_object: None,
            moving: false,
            throttle: Throttle::new(Duration::from_millis(options.frame_interval_ms)),
        }
    }

    pub fn options(&self) -> &GuideOptions {
        &self.options
    }

    /// Process one drag frame of `id`.
    ///
    /// Returns the correction applied to the object, or None if the frame
    /// was skipped (disabled, throttled or unknown object).
    pub fn handle_object_moving<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        id: ObjectId,
        now: Duration,
    ) -> Option<Vec2> {
        if !self.options.enabled || !self.throttle.admit(now) {
            return None;
        }
        self.active_object = Some(id);
        self.moving = true;
        self.clear_lines();

        let moving = Anchors::of(&*scene, id)?;
        let others: Vec<Anchors> = scene
            .object_ids()
            .into_iter()
            .filter(|&other| other != id && scene.is_visible(other))
            .filter_map(|other| Anchors::of(&*scene, other))
            .collect();

        let zoom = scene.zoom();
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        let frame = compute_alignment(
            &moving,
            &others,
            scene.canvas_size(),
            self.options.line_margin / zoom,
        );
        let delta = frame.bounded_delta(self.options.line_margin * MAX_SNAP_FACTOR);
        self.vertical_lines = frame.vertical;
        self.horizontal_lines = frame.horizontal;

        if delta != Vec2::ZERO {
            scene.translate(id, delta);
            log::debug!("Snapped {} by ({:.2}, {:.2})", id, delta.x, delta.y);
        }
        Some(delta)
    }

    pub fn handle_pointer_down(&mut self) {
        self.moving = false;
        self.clear_lines();
    }

    pub fn handle_pointer_up(&mut self) {
        self.moving = false;
        self.active_object = None;
        self.clear_lines();
    }

    /// Selection created or updated.
    pub fn handle_selection_changed(&mut self, selected: &[ObjectId]) {
        self.active_object = selected.first().copied();
        if !self.moving {
            self.clear_lines();
        }
    }

    pub fn handle_selection_cleared(&mut self) {
        self.active_object = None;
        self.moving = false;
        self.clear_lines();
    }

    pub fn handle_object_modified(&mut self) {
        self.moving = false;
        self.clear_lines();
    }

    /// Screen-space segments to paint for the current frame.
    pub fn overlay_segments<S: SceneGraph + SelectionModel + ?Sized>(&self, scene: &S) -> Vec<Line> {
        if !self.options.enabled || !self.moving {
            return Vec::new();
        }
        let Some(active) = self.active_object else {
            return Vec::new();
        };
        if !scene.selection().contains(&active) {
            return Vec::new();
        }
        let Some(anchors) = Anchors::of(scene, active) else {
            return Vec::new();
        };
        let transform = scene.viewport_transform();
        self.lines()
            .filter(|line| line.touches(&anchors, LINE_DRAW_TOLERANCE))
            .map(|line| line.to_screen(transform))
            .collect()
    }

    /// Repaint the overlay: always clears, then draws the current guides.
    pub fn render<S, P>(&mut self, scene: &S, painter: &mut P)
    where
        S: SceneGraph + SelectionModel + ?Sized,
        P: GuidePainter + ?Sized,
    {
        painter.clear();
        if !self.options.enabled || !self.moving {
            return;
        }
        if let Some(active) = self.active_object {
            if !scene.selection().contains(&active) {
                self.moving = false;
                return;
            }
        }
        let stroke = self.stroke();
        for segment in self.overlay_segments(scene) {
            painter.stroke_line(segment, &stroke);
        }
    }

    pub fn stroke(&self) -> GuideStroke {
        GuideStroke {
            color: self.options.line_color,
            width: self.options.line_width,
            dash: GUIDE_DASH,
            alpha: GUIDE_ALPHA,
        }
    }

    pub fn enable(&mut self) {
        self.options.enabled = true;
    }

    /// Stop processing drag frames and drop any drawn guides.
    pub fn disable(&mut self) {
        self.options.enabled = false;
        self.moving = false;
        self.clear_lines();
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    pub fn force_clear(&mut self) {
        self.moving = false;
        self.active_object = None;
        self.clear_lines();
    }

    pub fn update_options(&mut self, update: GuideOptionsUpdate) {
        if let Some(color) = update.line_color {
            self.options.line_color = color;
        }
        if let Some(width) = update.line_width {
            self.options.line_width = width;
        }
        if let Some(margin) = update.line_margin {
            self.options.line_margin = margin;
        }
        match update.enabled {
            Some(true) => self.enable(),
            Some(false) => self.disable(),
            None => {}
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn active_object(&self) -> Option<ObjectId> {
        self.active_object
    }

    pub fn vertical_lines(&self) -> &[SnapLine] {
        &self.vertical_lines
    }

    pub fn horizontal_lines(&self) -> &[SnapLine] {
        &self.horizontal_lines
    }

    pub fn lines(&self) -> impl Iterator<Item = &SnapLine> {
        self.vertical_lines.iter().chain(self.horizontal_lines.iter())
    }

    fn clear_lines(&mut self) {
        self.vertical_lines.clear();
        self.horizontal_lines.clear();
    }
}
