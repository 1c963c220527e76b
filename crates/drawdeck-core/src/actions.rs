//! Built-in editing actions over the active selection.
//!
//! These work against any scene provider. Programmatic moves through
//! [`SceneGraph::translate`] raise no scene events, so callers that want the
//! change in history must record it themselves (the editor does).

use crate::clipboard::ClipboardBuffer;
use crate::scene::{Groupable, ObjectId, SceneGraph, SceneSerializer, SelectionModel};
use kurbo::{Rect, Vec2};
use serde_json::Value;

/// Offset applied to pasted objects so they don't cover the originals.
pub const DEFAULT_PASTE_OFFSET: f64 = 20.0;

/// Result of [`toggle_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChange {
    Grouped(ObjectId),
    Ungrouped(Vec<ObjectId>),
    Unchanged,
}

/// Edge or center to line objects up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

/// Serialize the selection into the clipboard as a JSON array.
///
/// Returns false when nothing is selected or serialization fails.
pub fn copy_selection<S>(scene: &S, clipboard: &mut ClipboardBuffer) -> bool
where
    S: SceneSerializer + SelectionModel + ?Sized,
{
    let selection = scene.selection();
    if selection.is_empty() {
        return false;
    }
    let payload = scene
        .export_objects(&selection)
        .and_then(|objects| {
            serde_json::to_string(&objects)
                .map_err(|e| crate::scene::SceneError::Serialization(e.to_string()))
        });
    match payload {
        Ok(text) => {
            clipboard.write(&text);
            log::debug!("Copied {} object(s)", selection.len());
            true
        }
        Err(e) => {
            log::warn!("Failed to copy selection: {}", e);
            false
        }
    }
}

/// Paste objects from the clipboard, shifted by `offset`, and select them.
///
/// Anything but a JSON array of objects is ignored. Returns the new ids.
pub fn paste<S>(scene: &mut S, clipboard: &mut ClipboardBuffer, offset: f64) -> Vec<ObjectId>
where
    S: SceneSerializer + SelectionModel + ?Sized,
{
    let Some(text) = clipboard.read() else {
        return Vec::new();
    };
    let Ok(Value::Array(objects)) = serde_json::from_str::<Value>(&text) else {
        log::debug!("Clipboard does not hold a list of objects, ignoring paste");
        return Vec::new();
    };
    if objects.is_empty() {
        return Vec::new();
    }

    let shifted = objects
        .into_iter()
        .map(|mut object| {
            if let Value::Object(fields) = &mut object {
                for key in ["left", "top"] {
                    let value = fields.get(key).and_then(Value::as_f64).unwrap_or(0.0);
                    fields.insert(key.to_string(), Value::from(value + offset));
                }
            }
            object
        })
        .collect();

    scene.clear_selection();
    match scene.import_objects(shifted) {
        Ok(ids) => {
            scene.set_selection(&ids);
            log::debug!("Pasted {} object(s)", ids.len());
            ids
        }
        Err(e) => {
            log::warn!("Failed to paste: {}", e);
            Vec::new()
        }
    }
}

/// Remove every selected object. Returns how many were removed.
pub fn delete_selection<S>(scene: &mut S) -> usize
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let selection = scene.selection();
    scene.clear_selection();
    selection.into_iter().filter(|&id| scene.remove(id)).count()
}

/// Group two or more selected objects, or dissolve a single selected group.
///
/// The new group, or the freed members, end up selected.
pub fn toggle_group<S>(scene: &mut S) -> GroupChange
where
    S: SelectionModel + Groupable + ?Sized,
{
    let selection = scene.selection();
    match selection.as_slice() {
        [] => GroupChange::Unchanged,
        [single] if scene.is_group(*single) => match scene.ungroup(*single) {
            Some(members) => {
                scene.set_selection(&members);
                GroupChange::Ungrouped(members)
            }
            None => GroupChange::Unchanged,
        },
        [_] => GroupChange::Unchanged,
        ids => {
            scene.clear_selection();
            match scene.group(ids) {
                Some(group) => {
                    scene.set_selection(&[group]);
                    GroupChange::Grouped(group)
                }
                None => {
                    scene.set_selection(ids);
                    GroupChange::Unchanged
                }
            }
        }
    }
}

/// Move every selected object by `(dx, dy)`.
pub fn nudge_selection<S>(scene: &mut S, dx: f64, dy: f64) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let delta = Vec2::new(dx, dy);
    let mut moved = false;
    for id in scene.selection() {
        moved |= scene.translate(id, delta);
    }
    moved
}

/// Rotate every selected object by `degrees` about its own center.
pub fn rotate_selection<S>(scene: &mut S, degrees: f64) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let mut rotated = false;
    for id in scene.selection() {
        rotated |= scene.rotate(id, degrees);
    }
    rotated
}

/// Move each selected object one step toward the front.
pub fn bring_forward<S>(scene: &mut S) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let count = scene.object_ids().len();
    let mut changed = false;
    for id in scene.selection() {
        if let Some(index) = scene.index_of(id) {
            if index + 1 < count {
                changed |= scene.move_to(id, index + 1);
            }
        }
    }
    changed
}

/// Move each selected object one step toward the back.
pub fn send_backward<S>(scene: &mut S) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let mut changed = false;
    for id in scene.selection() {
        if let Some(index) = scene.index_of(id) {
            if index > 0 {
                changed |= scene.move_to(id, index - 1);
            }
        }
    }
    changed
}

pub fn bring_to_front<S>(scene: &mut S) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let mut changed = false;
    for id in scene.selection() {
        let top = scene.object_ids().len().saturating_sub(1);
        if scene.index_of(id).is_some_and(|index| index != top) {
            changed |= scene.move_to(id, top);
        }
    }
    changed
}

pub fn send_to_back<S>(scene: &mut S) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let mut changed = false;
    for id in scene.selection() {
        if scene.index_of(id).is_some_and(|index| index != 0) {
            changed |= scene.move_to(id, 0);
        }
    }
    changed
}

/// Select every visible, selectable object.
pub fn select_all<S>(scene: &mut S) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let ids: Vec<ObjectId> = scene
        .object_ids()
        .into_iter()
        .filter(|&id| scene.is_selectable(id))
        .collect();
    if ids.is_empty() {
        return false;
    }
    scene.set_selection(&ids);
    true
}

/// Align the selection.
///
/// A single object aligns to the canvas; several align to their combined
/// bounds.
pub fn align_selection<S>(scene: &mut S, alignment: Alignment) -> bool
where
    S: SceneGraph + SelectionModel + ?Sized,
{
    let items: Vec<(ObjectId, Rect)> = scene
        .selection()
        .into_iter()
        .filter_map(|id| scene.bounds(id).map(|b| (id, b)))
        .collect();
    let reference = match items.as_slice() {
        [] => return false,
        [_] => scene.canvas_size().to_rect(),
        [(_, first), rest @ ..] => rest.iter().fold(*first, |acc, (_, b)| acc.union(*b)),
    };

    let mut moved = false;
    for (id, bounds) in items {
        let delta = match alignment {
            Alignment::Left => Vec2::new(reference.x0 - bounds.x0, 0.0),
            Alignment::Center => Vec2::new(reference.center().x - bounds.center().x, 0.0),
            Alignment::Right => Vec2::new(reference.x1 - bounds.x1, 0.0),
            Alignment::Top => Vec2::new(0.0, reference.y0 - bounds.y0),
            Alignment::Middle => Vec2::new(0.0, reference.center().y - bounds.center().y),
            Alignment::Bottom => Vec2::new(0.0, reference.y1 - bounds.y1),
        };
        if delta != Vec2::ZERO {
            moved |= scene.translate(id, delta);
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::shapes::Shape;
    use kurbo::Point;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::rectangle(Rect::from_origin_size(Point::new(x, y), (w, h)))
    }

    fn left_top(canvas: &Canvas, id: ObjectId) -> (f64, f64) {
        let shape = canvas.shape(id).unwrap();
        (shape.left, shape.top)
    }

    #[test]
    fn test_copy_paste_two_objects() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(10.0, 10.0, 20.0, 20.0));
        let b = canvas.add_shape(rect(50.0, 60.0, 20.0, 20.0));
        canvas.set_selection(&[a, b]);
        let mut clipboard = ClipboardBuffer::new();

        assert!(copy_selection(&canvas, &mut clipboard));
        let pasted = paste(&mut canvas, &mut clipboard, DEFAULT_PASTE_OFFSET);

        assert_eq!(pasted.len(), 2);
        assert_eq!(canvas.object_ids().len(), 4);
        assert!(!pasted.contains(&a) && !pasted.contains(&b));
        assert_eq!(canvas.selection(), pasted);
        assert_eq!(left_top(&canvas, pasted[0]), (30.0, 30.0));
        assert_eq!(left_top(&canvas, pasted[1]), (70.0, 80.0));
    }

    #[test]
    fn test_copy_without_selection() {
        let mut canvas = Canvas::new();
        canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        let mut clipboard = ClipboardBuffer::new();
        assert!(!copy_selection(&canvas, &mut clipboard));
        assert_eq!(clipboard.read(), None);
    }

    #[test]
    fn test_paste_ignores_non_array() {
        let mut canvas = Canvas::new();
        let mut clipboard = ClipboardBuffer::new();
        for text in ["not json", "{\"left\": 1}", "[]", "[{\"bogus\": true}]"] {
            clipboard.write(text);
            assert!(paste(&mut canvas, &mut clipboard, 20.0).is_empty());
        }
        assert!(canvas.object_ids().is_empty());
    }

    #[test]
    fn test_delete_selection() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        let b = canvas.add_shape(rect(20.0, 0.0, 10.0, 10.0));
        canvas.set_selection(&[a]);
        assert_eq!(delete_selection(&mut canvas), 1);
        assert_eq!(canvas.object_ids(), vec![b]);
        assert!(canvas.selection().is_empty());
        assert_eq!(delete_selection(&mut canvas), 0);
    }

    #[test]
    fn test_toggle_group_round_trip() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        let b = canvas.add_shape(rect(20.0, 0.0, 10.0, 10.0));
        canvas.set_selection(&[a, b]);

        let GroupChange::Grouped(group) = toggle_group(&mut canvas) else {
            panic!("expected a group");
        };
        assert_eq!(canvas.object_ids(), vec![group]);
        assert_eq!(canvas.selection(), vec![group]);

        let GroupChange::Ungrouped(members) = toggle_group(&mut canvas) else {
            panic!("expected ungroup");
        };
        assert_eq!(members.len(), 2);
        assert_eq!(canvas.selection().len(), 2);
        for id in members {
            let shape = canvas.shape(id).unwrap();
            assert!(shape.selectable && shape.evented);
        }
    }

    #[test]
    fn test_toggle_group_single_plain_object() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        canvas.set_selection(&[a]);
        assert_eq!(toggle_group(&mut canvas), GroupChange::Unchanged);
        assert_eq!(toggle_group(&mut Canvas::new()), GroupChange::Unchanged);
    }

    #[test]
    fn test_nudge_and_rotate() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        assert!(!nudge_selection(&mut canvas, 1.0, 0.0));
        canvas.set_selection(&[a]);
        assert!(nudge_selection(&mut canvas, -10.0, 1.0));
        assert_eq!(left_top(&canvas, a), (-10.0, 1.0));
        assert!(rotate_selection(&mut canvas, 10.0));
        assert_eq!(canvas.shape(a).unwrap().angle, 10.0);
    }

    #[test]
    fn test_z_order() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        let b = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        let c = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        canvas.set_selection(&[a]);

        assert!(bring_forward(&mut canvas));
        assert_eq!(canvas.object_ids(), vec![b, a, c]);
        assert!(bring_to_front(&mut canvas));
        assert_eq!(canvas.object_ids(), vec![b, c, a]);
        assert!(!bring_forward(&mut canvas));
        assert!(send_backward(&mut canvas));
        assert_eq!(canvas.object_ids(), vec![b, a, c]);
        assert!(send_to_back(&mut canvas));
        assert_eq!(canvas.object_ids(), vec![a, b, c]);
        assert!(!send_to_back(&mut canvas));
    }

    #[test]
    fn test_select_all_skips_hidden_and_locked() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(0.0, 0.0, 10.0, 10.0));
        let mut hidden = rect(0.0, 0.0, 10.0, 10.0);
        hidden.visible = false;
        canvas.add_shape(hidden);
        let mut locked = rect(0.0, 0.0, 10.0, 10.0);
        locked.selectable = false;
        canvas.add_shape(locked);

        assert!(select_all(&mut canvas));
        assert_eq!(canvas.selection(), vec![a]);
        assert!(!select_all(&mut Canvas::new()));
    }

    #[test]
    fn test_align_to_combined_bounds() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(10.0, 0.0, 10.0, 10.0));
        let b = canvas.add_shape(rect(40.0, 50.0, 20.0, 10.0));
        canvas.set_selection(&[a, b]);

        assert!(align_selection(&mut canvas, Alignment::Left));
        assert_eq!(left_top(&canvas, b).0, 10.0);
        assert!(align_selection(&mut canvas, Alignment::Bottom));
        assert_eq!(left_top(&canvas, a).1, 50.0);
        assert!(!align_selection(&mut canvas, Alignment::Left));
    }

    #[test]
    fn test_align_single_to_canvas() {
        let mut canvas = Canvas::new();
        let a = canvas.add_shape(rect(10.0, 10.0, 100.0, 100.0));
        canvas.set_selection(&[a]);
        assert!(align_selection(&mut canvas, Alignment::Center));
        assert!(align_selection(&mut canvas, Alignment::Middle));
        assert_eq!(canvas.center(a), Some(Point::new(400.0, 300.0)));
    }
}
