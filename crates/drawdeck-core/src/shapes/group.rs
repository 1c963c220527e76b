//! Group shape for combining multiple shapes.

use super::{Shape, ShapeId};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Children of a composite shape, back to front.
/// Groups can contain other groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub children: Vec<Shape>,
}

impl Group {
    pub fn new(children: Vec<Shape>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[Shape] {
        &self.children
    }

    /// Dissolve this group and return its children.
    pub fn ungroup(self) -> Vec<Shape> {
        self.children
    }

    /// Union of the children's bounds.
    pub fn bounds(&self) -> Rect {
        let mut iter = self.children.iter().map(Shape::bounds);
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(first, |acc, b| acc.union(b))
    }

    /// All shape IDs in this group, including nested groups.
    pub fn all_shape_ids(&self) -> Vec<ShapeId> {
        let mut ids = Vec::new();
        for child in &self.children {
            ids.push(child.id);
            if let super::ShapeKind::Group(group) = &child.kind {
                ids.extend(group.all_shape_ids());
            }
        }
        ids
    }
}
