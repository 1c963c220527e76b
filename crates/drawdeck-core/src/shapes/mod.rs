//! Shape definitions for the reference scene.

mod group;

pub use group::Group;

use kurbo::{Affine, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Serializable color representation (RGBA8), written as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    pub fn from_hex(color: &str) -> Option<Self> {
        let color = color.trim();
        if color == "transparent" {
            return Some(Self::transparent());
        }
        let hex = color.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Scale the alpha channel by `factor` (0.0 to 1.0).
    pub fn with_alpha_factor(self, factor: f64) -> Self {
        let a = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
            opacity: 1.0,
        }
    }
}

/// What a shape draws. Rendering is left to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapeKind {
    Rectangle {
        #[serde(default)]
        corner_radius: f64,
    },
    Ellipse,
    Line,
    /// Freehand or pen path in SVG path syntax.
    Path { data: String },
    Text {
        content: String,
        font_size: f64,
        font_family: String,
    },
    Image { source: String },
    /// Styled QR code; `image` is the already rendered payload.
    QrCode { payload: String, image: String },
    Group(Group),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle { .. } => "rectangle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Line => "line",
            ShapeKind::Path { .. } => "path",
            ShapeKind::Text { .. } => "text",
            ShapeKind::Image { .. } => "image",
            ShapeKind::QrCode { .. } => "qrcode",
            ShapeKind::Group(_) => "group",
        }
    }
}

/// A scene object.
///
/// `left`/`top`/`width`/`height` describe the unrotated box; `angle` rotates
/// it about its center. For groups the box is derived from the children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub selectable: bool,
    #[serde(default = "default_true")]
    pub evented: bool,
    #[serde(default)]
    pub style: ShapeStyle,
}

impl Shape {
    pub fn new(kind: ShapeKind, rect: Rect) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            left: rect.x0,
            top: rect.y0,
            width: rect.width(),
            height: rect.height(),
            angle: 0.0,
            visible: true,
            selectable: true,
            evented: true,
            style: ShapeStyle::default(),
        }
    }

    pub fn rectangle(rect: Rect) -> Self {
        Self::new(ShapeKind::Rectangle { corner_radius: 0.0 }, rect)
    }

    pub fn ellipse(rect: Rect) -> Self {
        Self::new(ShapeKind::Ellipse, rect)
    }

    pub fn text(origin: Point, content: impl Into<String>, font_size: f64) -> Self {
        let content = content.into();
        // Rough box until the host measures the text.
        let width = content.chars().count() as f64 * font_size * 0.6;
        let rect = Rect::from_origin_size(origin, (width, font_size * 1.2));
        Self::new(
            ShapeKind::Text {
                content,
                font_size,
                font_family: "Arial".to_string(),
            },
            rect,
        )
    }

    /// Wrap shapes into a group whose box encloses them.
    pub fn group(children: Vec<Shape>) -> Self {
        let group = Group::new(children);
        let rect = group.bounds();
        Self::new(ShapeKind::Group(group), rect)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ShapeKind::Group(_))
    }

    /// The unrotated box.
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.left + self.width, self.top + self.height)
    }

    /// Axis-aligned bounds including rotation.
    pub fn bounds(&self) -> Rect {
        if let ShapeKind::Group(group) = &self.kind {
            if !group.children.is_empty() {
                return group.bounds();
            }
        }
        let rect = self.rect();
        if self.angle == 0.0 {
            return rect;
        }
        Affine::rotate_about(self.angle.to_radians(), rect.center()).transform_rect_bbox(rect)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.left += delta.x;
        self.top += delta.y;
        if let ShapeKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.translate(delta);
            }
        }
    }

    /// Rotate about `pivot`, moving the center along and adding to `angle`.
    pub fn rotate_about(&mut self, degrees: f64, pivot: Point) {
        let center = self.rect().center();
        let moved = Affine::rotate_about(degrees.to_radians(), pivot) * center;
        self.left += moved.x - center.x;
        self.top += moved.y - center.y;
        self.angle = (self.angle + degrees).rem_euclid(360.0);
        if let ShapeKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.rotate_about(degrees, pivot);
            }
        }
        self.refresh_group_box();
    }

    /// Give this shape (and any children) fresh ids.
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
        if let ShapeKind::Group(group) = &mut self.kind {
            for child in &mut group.children {
                child.regenerate_id();
            }
        }
    }

    /// Bring children in line with the group's `left`/`top` after the
    /// payload was edited directly.
    pub fn sync_children(&mut self) {
        if let ShapeKind::Group(group) = &mut self.kind {
            if group.children.is_empty() {
                return;
            }
            let origin = group.bounds().origin();
            let delta = Vec2::new(self.left - origin.x, self.top - origin.y);
            if delta != Vec2::ZERO {
                for child in &mut group.children {
                    child.translate(delta);
                }
            }
            self.refresh_group_box();
        }
    }

    /// Recompute a group's box from its children.
    pub fn refresh_group_box(&mut self) {
        if let ShapeKind::Group(group) = &self.kind {
            if group.children.is_empty() {
                return;
            }
            let rect = group.bounds();
            self.left = rect.x0;
            self.top = rect.y0;
            self.width = rect.width();
            self.height = rect.height();
        }
    }
}
