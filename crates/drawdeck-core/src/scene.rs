//! Interfaces to the scene graph that owns the editable objects.
//!
//! The editing core never looks inside an object. It works through these
//! capability traits: geometry queries and position changes
//! ([`SceneGraph`]), snapshot tokens and object payloads
//! ([`SceneSerializer`]), the active selection ([`SelectionModel`]) and
//! composite handling ([`Groupable`]). [`crate::canvas::Canvas`] is the
//! in-memory implementation.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use thiserror::Error;
use uuid::Uuid;

/// Opaque handle to an object owned by the scene.
pub type ObjectId = Uuid;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Object not found: {0}")]
    NotFound(ObjectId),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Events raised by the scene as the user interacts with it.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ObjectAdded(ObjectId),
    ObjectModified(ObjectId),
    ObjectRemoved(ObjectId),
    /// A freehand path was committed.
    PathCreated(ObjectId),
    ObjectSkewing(ObjectId),
    /// An object is being dragged; raised once per pointer move.
    ObjectMoving(ObjectId),
    SelectionCreated(Vec<ObjectId>),
    SelectionUpdated(Vec<ObjectId>),
    SelectionCleared,
    PointerDown,
    PointerUp,
}

impl SceneEvent {
    /// Whether this event changes persisted scene state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            SceneEvent::ObjectAdded(_)
                | SceneEvent::ObjectModified(_)
                | SceneEvent::ObjectRemoved(_)
                | SceneEvent::PathCreated(_)
                | SceneEvent::ObjectSkewing(_)
        )
    }
}

/// Geometry, ordering and viewport queries.
pub trait SceneGraph {
    /// All objects, back to front.
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Axis-aligned bounding box in scene coordinates.
    fn bounds(&self, id: ObjectId) -> Option<Rect>;

    fn center(&self, id: ObjectId) -> Option<Point> {
        self.bounds(id).map(|b| b.center())
    }

    fn is_visible(&self, id: ObjectId) -> bool;

    fn is_selectable(&self, id: ObjectId) -> bool {
        self.is_visible(id)
    }

    /// Move an object. Programmatic moves raise no events.
    fn translate(&mut self, id: ObjectId, delta: Vec2) -> bool;

    /// Rotate an object about its center by `degrees`.
    fn rotate(&mut self, id: ObjectId, degrees: f64) -> bool;

    fn remove(&mut self, id: ObjectId) -> bool;

    /// Position in the back-to-front order.
    fn index_of(&self, id: ObjectId) -> Option<usize>;

    /// Move an object to `index` in the back-to-front order (clamped).
    fn move_to(&mut self, id: ObjectId, index: usize) -> bool;

    /// Logical canvas size, used for the canvas center.
    fn canvas_size(&self) -> Size;

    fn zoom(&self) -> f64;

    /// Scene to screen transform (pan and zoom).
    fn viewport_transform(&self) -> Affine;

    /// Drain the events raised since the last call.
    fn take_events(&mut self) -> Vec<SceneEvent>;
}

/// Whole-scene snapshots and per-object payloads.
pub trait SceneSerializer {
    /// Serialize the whole scene into an opaque token.
    fn to_token(&self) -> SceneResult<String>;

    /// Replace the scene with the one encoded in `token`.
    ///
    /// On error the scene is left untouched.
    fn load_token(&mut self, token: &str) -> SceneResult<()>;

    /// Serialize the given objects. Each value carries numeric `left` and
    /// `top` fields.
    fn export_objects(&self, ids: &[ObjectId]) -> SceneResult<Vec<serde_json::Value>>;

    /// Add objects from payloads under fresh ids, returning the new ids.
    fn import_objects(&mut self, objects: Vec<serde_json::Value>) -> SceneResult<Vec<ObjectId>>;
}

/// The active selection.
pub trait SelectionModel {
    fn selection(&self) -> Vec<ObjectId>;
    fn set_selection(&mut self, ids: &[ObjectId]);
    fn clear_selection(&mut self);
}

/// Composite objects.
pub trait Groupable {
    fn is_group(&self, id: ObjectId) -> bool;

    /// Wrap `ids` into a new composite, returning its id.
    fn group(&mut self, ids: &[ObjectId]) -> Option<ObjectId>;

    /// Dissolve a composite, returning its members. Members come back
    /// selectable and evented.
    fn ungroup(&mut self, id: ObjectId) -> Option<Vec<ObjectId>>;
}

/// Everything the editor needs from a scene provider.
pub trait Scene: SceneGraph + SceneSerializer + SelectionModel + Groupable {}

impl<T: SceneGraph + SceneSerializer + SelectionModel + Groupable> Scene for T {}
