//! In-memory scene: document, z-order, selection and viewport.
//!
//! [`Canvas`] implements every [`crate::scene`] trait and raises the same
//! events an interactive canvas would, which makes it the scene used by the
//! editor tests and by hosts without a scene graph of their own.

use crate::camera::Camera;
use crate::scene::{
    Groupable, ObjectId, SceneError, SceneEvent, SceneGraph, SceneResult, SceneSerializer,
    SelectionModel,
};
use crate::shapes::{Shape, ShapeId, ShapeKind};
use kurbo::{Affine, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default logical canvas size.
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;

/// Serialized form of the whole document, shapes back to front.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub objects: Vec<Shape>,
}

/// A canvas document containing all shapes.
#[derive(Debug, Clone)]
pub struct CanvasDocument {
    /// Unique document identifier.
    pub id: String,
    pub name: String,
    /// All shapes in the document, keyed by ID.
    pub shapes: HashMap<ShapeId, Shape>,
    /// Z-order of shapes (back to front).
    pub z_order: Vec<ShapeId>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            shapes: HashMap::new(),
            z_order: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            objects: self.shapes_ordered().cloned().collect(),
        }
    }

    /// Replace all shapes with the snapshot's.
    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.shapes.clear();
        self.z_order.clear();
        for shape in snapshot.objects {
            self.add_shape(shape);
        }
    }

    pub fn add_shape(&mut self, shape: Shape) {
        let id = shape.id;
        self.z_order.retain(|&shape_id| shape_id != id);
        self.z_order.push(id);
        self.shapes.insert(id, shape);
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        self.z_order.retain(|&shape_id| shape_id != id);
        self.shapes.remove(&id)
    }

    pub fn get_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    /// Get shapes in z-order (back to front).
    pub fn shapes_ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// Move a shape to `index` in the z-order, clamped to the valid range.
    pub fn move_to(&mut self, id: ShapeId, index: usize) -> bool {
        let Some(pos) = self.z_order.iter().position(|&shape_id| shape_id == id) else {
            return false;
        };
        self.z_order.remove(pos);
        let index = index.min(self.z_order.len());
        self.z_order.insert(index, id);
        pos != index
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Group the given shapes into a single group.
    /// Returns the new group's ID, or None if less than 2 shapes were provided.
    /// The group takes the z-position of the frontmost member.
    pub fn group_shapes(&mut self, shape_ids: &[ShapeId]) -> Option<ShapeId> {
        let members: Vec<(usize, ShapeId)> = self
            .z_order
            .iter()
            .enumerate()
            .filter(|(_, id)| shape_ids.contains(id))
            .map(|(idx, &id)| (idx, id))
            .collect();
        if members.len() < 2 {
            return None;
        }
        let front = members.iter().map(|(idx, _)| *idx).max()?;

        let children: Vec<Shape> = members
            .iter()
            .filter_map(|(_, id)| self.remove_shape(*id))
            .collect();
        let group = Shape::group(children);
        let group_id = group.id;

        // Members in front of the group's slot were removed too.
        let insert_pos = (front + 1 - members.len()).min(self.z_order.len());
        self.shapes.insert(group_id, group);
        self.z_order.insert(insert_pos, group_id);
        Some(group_id)
    }

    /// Ungroup a group shape, returning its children to the document at the
    /// group's z-position. Returns None if the shape is not a group.
    pub fn ungroup_shape(&mut self, group_id: ShapeId) -> Option<Vec<ShapeId>> {
        if !self.shapes.get(&group_id)?.is_group() {
            return None;
        }
        let z_pos = self.z_order.iter().position(|&id| id == group_id)?;
        let group = self.remove_shape(group_id)?;
        let ShapeKind::Group(group) = group.kind else {
            return None;
        };

        let mut child_ids = Vec::new();
        for (i, mut child) in group.ungroup().into_iter().enumerate() {
            child.selectable = true;
            child.evented = true;
            let child_id = child.id;
            self.shapes.insert(child_id, child);
            self.z_order.insert(z_pos + i, child_id);
            child_ids.push(child_id);
        }
        Some(child_ids)
    }
}

/// Runtime canvas state.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub document: CanvasDocument,
    /// Camera for view transform.
    pub camera: Camera,
    /// Currently selected shape IDs.
    pub selection: Vec<ShapeId>,
    /// Logical canvas size.
    pub canvas_size: Size,
    events: Vec<SceneEvent>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self::with_document(CanvasDocument::new())
    }

    pub fn with_document(document: CanvasDocument) -> Self {
        Self {
            document,
            camera: Camera::new(),
            selection: Vec::new(),
            canvas_size: Size::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT),
            events: Vec::new(),
        }
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_size = Size::new(width, height);
    }

    fn emit(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    /// Add a shape on top of the z-order.
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id;
        self.document.add_shape(shape);
        self.emit(SceneEvent::ObjectAdded(id));
        id
    }

    /// Add a committed freehand path.
    pub fn add_path(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id;
        self.document.add_shape(shape);
        self.emit(SceneEvent::PathCreated(id));
        id
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.document.get_shape(id)
    }

    /// Edit a shape's properties.
    pub fn modify_shape(&mut self, id: ShapeId, edit: impl FnOnce(&mut Shape)) -> bool {
        let Some(shape) = self.document.get_shape_mut(id) else {
            return false;
        };
        edit(shape);
        shape.refresh_group_box();
        self.emit(SceneEvent::ObjectModified(id));
        true
    }

    /// One pointer-move step of a skew handle.
    pub fn skew_object(&mut self, id: ShapeId, edit: impl FnOnce(&mut Shape)) -> bool {
        let Some(shape) = self.document.get_shape_mut(id) else {
            return false;
        };
        edit(shape);
        self.emit(SceneEvent::ObjectSkewing(id));
        true
    }

    pub fn pointer_down(&mut self) {
        self.emit(SceneEvent::PointerDown);
    }

    /// One pointer-move step of an interactive drag.
    pub fn drag_object(&mut self, id: ShapeId, delta: Vec2) -> bool {
        let Some(shape) = self.document.get_shape_mut(id) else {
            return false;
        };
        shape.translate(delta);
        self.emit(SceneEvent::ObjectMoving(id));
        true
    }

    /// Finish an interactive drag.
    pub fn release_drag(&mut self, id: ShapeId) {
        if self.document.get_shape(id).is_some() {
            self.emit(SceneEvent::ObjectModified(id));
        }
        self.emit(SceneEvent::PointerUp);
    }

    /// Change the selection the way a click or marquee would.
    pub fn select_by_pointer(&mut self, ids: &[ShapeId]) {
        let was_empty = self.selection.is_empty();
        self.set_selection(ids);
        let event = match (was_empty, self.selection.is_empty()) {
            (_, true) => SceneEvent::SelectionCleared,
            (true, false) => SceneEvent::SelectionCreated(self.selection.clone()),
            (false, false) => SceneEvent::SelectionUpdated(self.selection.clone()),
        };
        self.emit(event);
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selection.contains(&id)
    }
}

impl SceneGraph for Canvas {
    fn object_ids(&self) -> Vec<ObjectId> {
        self.document.z_order.clone()
    }

    fn bounds(&self, id: ObjectId) -> Option<Rect> {
        self.document.get_shape(id).map(Shape::bounds)
    }

    fn is_visible(&self, id: ObjectId) -> bool {
        self.document.get_shape(id).is_some_and(|s| s.visible)
    }

    fn is_selectable(&self, id: ObjectId) -> bool {
        self.document
            .get_shape(id)
            .is_some_and(|s| s.visible && s.selectable)
    }

    fn translate(&mut self, id: ObjectId, delta: Vec2) -> bool {
        match self.document.get_shape_mut(id) {
            Some(shape) => {
                shape.translate(delta);
                true
            }
            None => false,
        }
    }

    fn rotate(&mut self, id: ObjectId, degrees: f64) -> bool {
        match self.document.get_shape_mut(id) {
            Some(shape) => {
                let pivot = shape.bounds().center();
                shape.rotate_about(degrees, pivot);
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: ObjectId) -> bool {
        if self.document.remove_shape(id).is_none() {
            return false;
        }
        self.selection.retain(|&s| s != id);
        self.emit(SceneEvent::ObjectRemoved(id));
        true
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.document.z_order.iter().position(|&shape_id| shape_id == id)
    }

    fn move_to(&mut self, id: ObjectId, index: usize) -> bool {
        self.document.move_to(id, index)
    }

    fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    fn viewport_transform(&self) -> Affine {
        self.camera.transform()
    }

    fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl SceneSerializer for Canvas {
    fn to_token(&self) -> SceneResult<String> {
        serde_json::to_string(&self.document.snapshot())
            .map_err(|e| SceneError::Serialization(e.to_string()))
    }

    fn load_token(&mut self, token: &str) -> SceneResult<()> {
        let snapshot: DocumentSnapshot = serde_json::from_str(token)
            .map_err(|e| SceneError::Deserialization(e.to_string()))?;

        let removed = std::mem::take(&mut self.document.z_order);
        self.document.restore(snapshot);
        self.selection.clear();
        for id in removed {
            self.emit(SceneEvent::ObjectRemoved(id));
        }
        for id in self.document.z_order.clone() {
            self.emit(SceneEvent::ObjectAdded(id));
        }
        Ok(())
    }

    fn export_objects(&self, ids: &[ObjectId]) -> SceneResult<Vec<serde_json::Value>> {
        ids.iter()
            .map(|&id| {
                let shape = self.document.get_shape(id).ok_or(SceneError::NotFound(id))?;
                serde_json::to_value(shape).map_err(|e| SceneError::Serialization(e.to_string()))
            })
            .collect()
    }

    fn import_objects(&mut self, objects: Vec<serde_json::Value>) -> SceneResult<Vec<ObjectId>> {
        let shapes = objects
            .into_iter()
            .map(serde_json::from_value::<Shape>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SceneError::InvalidPayload(e.to_string()))?;

        let mut ids = Vec::with_capacity(shapes.len());
        for mut shape in shapes {
            shape.regenerate_id();
            shape.sync_children();
            ids.push(self.add_shape(shape));
        }
        Ok(ids)
    }
}

impl SelectionModel for Canvas {
    fn selection(&self) -> Vec<ObjectId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, ids: &[ObjectId]) {
        self.selection.clear();
        for &id in ids {
            if self.document.get_shape(id).is_some() && !self.selection.contains(&id) {
                self.selection.push(id);
            }
        }
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
    }
}

impl Groupable for Canvas {
    fn is_group(&self, id: ObjectId) -> bool {
        self.document.get_shape(id).is_some_and(Shape::is_group)
    }

    fn group(&mut self, ids: &[ObjectId]) -> Option<ObjectId> {
        let group_id = self.document.group_shapes(ids)?;
        self.selection.retain(|id| !ids.contains(id));
        for &id in ids {
            self.emit(SceneEvent::ObjectRemoved(id));
        }
        self.emit(SceneEvent::ObjectAdded(group_id));
        Some(group_id)
    }

    fn ungroup(&mut self, id: ObjectId) -> Option<Vec<ObjectId>> {
        let children = self.document.ungroup_shape(id)?;
        self.selection.retain(|&s| s != id);
        self.emit(SceneEvent::ObjectRemoved(id));
        for &child in &children {
            self.emit(SceneEvent::ObjectAdded(child));
        }
        Some(children)
    }
}
