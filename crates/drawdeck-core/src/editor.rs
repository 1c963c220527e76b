//! Editor orchestration.
//!
//! [`Editor`] wires a scene to the history manager, the alignment guides and
//! the shortcut dispatcher. The scene queues [`SceneEvent`]s; the editor
//! drains them in [`Editor::pump_events`] and routes each one:
//!
//! - object added/modified/removed, path created, skewing: history capture
//! - object moving: alignment guides
//! - selection and pointer events: guide lifecycle

use crate::actions::{self, Alignment, GroupChange};
use crate::clipboard::ClipboardBuffer;
use crate::config::EditorConfig;
use crate::history::{HistoryManager, HistoryStatus};
use crate::input::KeyEvent;
use crate::scene::{Scene, SceneEvent};
use crate::scheduler::Clock;
use crate::shortcuts::{Dispatch, EditorCommands, ShortcutDispatcher, default_shortcuts};
use crate::snap::{AlignmentGuides, GuidePainter};
use std::rc::Rc;
use std::time::Duration;

/// Everything shortcut actions operate on.
pub struct EditorContext<S: Scene> {
    pub scene: S,
    pub history: HistoryManager,
    pub guides: AlignmentGuides,
    pub clipboard: ClipboardBuffer,
    pub config: EditorConfig,
    clock: Rc<dyn Clock>,
}

impl<S: Scene> EditorContext<S> {
    pub fn new(scene: S, config: EditorConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            scene,
            history: HistoryManager::new(config.history),
            guides: AlignmentGuides::new(config.guides),
            clipboard: ClipboardBuffer::new(),
            config,
            clock,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Route one scene event.
    pub fn route_event(&mut self, event: SceneEvent) {
        let now = self.now();
        if event.is_mutation() {
            self.history.record_mutation(now);
        }
        match event {
            SceneEvent::ObjectMoving(id) => {
                self.guides.handle_object_moving(&mut self.scene, id, now);
            }
            SceneEvent::ObjectModified(_) => self.guides.handle_object_modified(),
            SceneEvent::SelectionCreated(ids) | SceneEvent::SelectionUpdated(ids) => {
                self.guides.handle_selection_changed(&ids)
            }
            SceneEvent::SelectionCleared => self.guides.handle_selection_cleared(),
            SceneEvent::PointerDown => self.guides.handle_pointer_down(),
            SceneEvent::PointerUp => self.guides.handle_pointer_up(),
            SceneEvent::ObjectAdded(_)
            | SceneEvent::ObjectRemoved(_)
            | SceneEvent::PathCreated(_)
            | SceneEvent::ObjectSkewing(_) => {}
        }
    }

    /// Drain and route queued scene events. Returns how many were routed.
    pub fn pump_events(&mut self) -> usize {
        let mut routed = 0;
        loop {
            let events = self.scene.take_events();
            if events.is_empty() {
                return routed;
            }
            routed += events.len();
            for event in events {
                self.route_event(event);
            }
        }
    }

    /// Fire due history timers.
    pub fn tick(&mut self) -> bool {
        self.pump_events();
        let now = self.now();
        self.history.poll(now, &self.scene)
    }

    /// Step back one snapshot. Events raised by the restore are routed while
    /// the history manager is applying, so they never become history.
    pub fn undo_change(&mut self) -> bool {
        self.pump_events();
        let now = self.now();
        if !self.history.undo(&mut self.scene, now) {
            return false;
        }
        self.complete_restore();
        true
    }

    pub fn redo_change(&mut self) -> bool {
        self.pump_events();
        let now = self.now();
        if !self.history.redo(&mut self.scene, now) {
            return false;
        }
        self.complete_restore();
        true
    }

    fn complete_restore(&mut self) {
        self.pump_events();
        self.history.finish_restore();
        self.guides.force_clear();
    }

    /// Capture now, for discrete actions that must land as their own entry.
    fn save_now(&mut self) {
        self.pump_events();
        let now = self.now();
        self.history.save_current_state_immediately(&self.scene, now);
    }

    /// Note a change made through silent scene calls.
    fn record_change(&mut self) {
        let now = self.now();
        self.history.record_mutation(now);
    }

    pub fn align(&mut self, alignment: Alignment) -> bool {
        let moved = actions::align_selection(&mut self.scene, alignment);
        if moved {
            self.record_change();
        }
        moved
    }
}

impl<S: Scene> EditorCommands for EditorContext<S> {
    fn copy(&mut self) {
        actions::copy_selection(&self.scene, &mut self.clipboard);
    }

    fn paste(&mut self) {
        let offset = self.config.paste_offset;
        if !actions::paste(&mut self.scene, &mut self.clipboard, offset).is_empty() {
            self.save_now();
        }
    }

    fn delete_selection(&mut self) {
        if actions::delete_selection(&mut self.scene) > 0 {
            self.pump_events();
        }
    }

    fn undo(&mut self) {
        self.undo_change();
    }

    fn redo(&mut self) {
        self.redo_change();
    }

    fn toggle_group(&mut self) {
        if actions::toggle_group(&mut self.scene) != GroupChange::Unchanged {
            self.save_now();
        }
    }

    fn nudge(&mut self, dx: f64, dy: f64) {
        if actions::nudge_selection(&mut self.scene, dx, dy) {
            self.record_change();
        }
    }

    fn rotate(&mut self, degrees: f64) {
        if actions::rotate_selection(&mut self.scene, degrees) {
            self.record_change();
        }
    }

    fn bring_forward(&mut self) {
        if actions::bring_forward(&mut self.scene) {
            self.record_change();
        }
    }

    fn send_backward(&mut self) {
        if actions::send_backward(&mut self.scene) {
            self.record_change();
        }
    }

    fn bring_to_front(&mut self) {
        if actions::bring_to_front(&mut self.scene) {
            self.record_change();
        }
    }

    fn send_to_back(&mut self) {
        if actions::send_to_back(&mut self.scene) {
            self.record_change();
        }
    }

    fn select_all(&mut self) {
        actions::select_all(&mut self.scene);
    }
}

/// A scene with history, alignment guides and keyboard shortcuts attached.
pub struct Editor<S: Scene + 'static> {
    context: EditorContext<S>,
    shortcuts: ShortcutDispatcher<EditorContext<S>>,
}

impl<S: Scene + 'static> Editor<S> {
    /// Attach to `scene`. Events the scene queued before this call are
    /// dropped; the initial snapshot is scheduled.
    pub fn new(mut scene: S, config: EditorConfig, clock: Rc<dyn Clock>) -> Self {
        let stale = scene.take_events();
        if !stale.is_empty() {
            log::debug!("Dropping {} scene event(s) raised before attach", stale.len());
        }

        let mut context = EditorContext::new(scene, config, clock);
        let now = context.now();
        if let Err(e) = context.history.initialize(now) {
            log::warn!("{}", e);
        }

        let mut shortcuts = ShortcutDispatcher::new();
        shortcuts.register_all(default_shortcuts(&config.shortcuts));
        shortcuts.set_enabled(config.shortcuts.enabled);

        Self { context, shortcuts }
    }

    pub fn with_clipboard(mut self, clipboard: ClipboardBuffer) -> Self {
        self.context.clipboard = clipboard;
        self
    }

    /// Dispatch a key press. Scene events raised by the action are routed
    /// before returning.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Dispatch {
        let outcome = self.shortcuts.dispatch(event, &mut self.context);
        if outcome.is_handled() {
            self.context.pump_events();
        }
        outcome
    }

    pub fn pump_events(&mut self) -> usize {
        self.context.pump_events()
    }

    /// Route pending events and fire due timers. Call once per frame.
    pub fn tick(&mut self) -> bool {
        self.context.tick()
    }

    pub fn undo(&mut self) -> bool {
        self.context.undo_change()
    }

    pub fn redo(&mut self) -> bool {
        self.context.redo_change()
    }

    pub fn can_undo(&self) -> bool {
        self.context.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.context.history.can_redo()
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.context.history.status()
    }

    pub fn align(&mut self, alignment: Alignment) -> bool {
        self.context.align(alignment)
    }

    /// Repaint the guide overlay.
    pub fn render_guides<P: GuidePainter + ?Sized>(&mut self, painter: &mut P) {
        let context = &mut self.context;
        context.guides.render(&context.scene, painter);
    }

    pub fn on_history_change(&mut self, listener: impl FnMut(HistoryStatus) + 'static) {
        self.context.history.set_change_listener(listener);
    }

    /// Cancel timers and drop the overlay.
    pub fn dispose(&mut self) {
        self.context.history.dispose();
        self.context.guides.force_clear();
    }

    pub fn scene(&self) -> &S {
        &self.context.scene
    }

    /// Mutable scene access. Events raised through it are routed on the next
    /// [`pump_events`](Self::pump_events) or [`tick`](Self::tick).
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.context.scene
    }

    pub fn context(&self) -> &EditorContext<S> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EditorContext<S> {
        &mut self.context
    }

    pub fn history(&self) -> &HistoryManager {
        &self.context.history
    }

    pub fn guides(&self) -> &AlignmentGuides {
        &self.context.guides
    }

    pub fn guides_mut(&mut self) -> &mut AlignmentGuides {
        &mut self.context.guides
    }

    pub fn shortcuts(&self) -> &ShortcutDispatcher<EditorContext<S>> {
        &self.shortcuts
    }

    pub fn shortcuts_mut(&mut self) -> &mut ShortcutDispatcher<EditorContext<S>> {
        &mut self.shortcuts
    }

    pub fn config(&self) -> &EditorConfig {
        &self.context.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::input::{FocusTarget, Modifiers};
    use crate::scene::{ObjectId, SceneGraph, SceneSerializer, SelectionModel};
    use crate::scheduler::ManualClock;
    use crate::shapes::{Shape, ShapeKind};
    use crate::shortcuts::{Category, Chord, IgnoreReason, Shortcut};
    use kurbo::{Line, Point, Rect, Vec2};
    use std::cell::Cell;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::rectangle(Rect::from_origin_size(Point::new(x, y), (w, h)))
    }

    struct Fixture {
        editor: Editor<Canvas>,
        clock: ManualClock,
        a: ObjectId,
        b: ObjectId,
    }

    /// Two shapes far from the canvas center, initial snapshot taken.
    fn fixture_with(config: EditorConfig) -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut canvas = Canvas::new();
        canvas.set_canvas_size(2000.0, 2000.0);
        let a = canvas.add_shape(rect(100.0, 100.0, 50.0, 50.0));
        let b = canvas.add_shape(rect(300.0, 300.0, 30.0, 30.0));

        let clock = ManualClock::new();
        let mut editor = Editor::new(canvas, config, Rc::new(clock.clone()));
        clock.advance_ms(100);
        assert!(editor.tick());
        Fixture { editor, clock, a, b }
    }

    fn fixture() -> Fixture {
        fixture_with(EditorConfig::default())
    }

    impl Fixture {
        fn token(&self) -> String {
            self.editor.scene().to_token().unwrap()
        }

        /// Let the capture debounce run out.
        fn settle(&mut self) {
            self.editor.tick();
            self.clock.advance_ms(300);
            self.editor.tick();
        }

        fn key(&mut self, key: &str, modifiers: Modifiers) -> Dispatch {
            self.editor.handle_key(&KeyEvent::new(key, modifiers))
        }

        fn left_top(&self, id: ObjectId) -> (f64, f64) {
            let shape = self.editor.scene().shape(id).unwrap();
            (shape.left, shape.top)
        }
    }

    #[derive(Default)]
    struct RecordingPainter {
        lines: Vec<Line>,
    }

    impl GuidePainter for RecordingPainter {
        fn clear(&mut self) {
            self.lines.clear();
        }

        fn stroke_line(&mut self, line: Line, _stroke: &crate::snap::GuideStroke) {
            self.lines.push(line);
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let f = fixture();
        let status = f.editor.history_status();
        assert_eq!(status.undo_depth, 1);
        assert!(!f.editor.can_undo());
        assert!(!f.editor.can_redo());
    }

    #[test]
    fn test_n_mutations_then_n_undos_returns_to_origin() {
        let mut f = fixture();
        let origin = f.token();
        let (a, b) = (f.a, f.b);

        f.editor.scene_mut().add_shape(rect(500.0, 500.0, 10.0, 10.0));
        f.settle();
        f.editor.scene_mut().modify_shape(a, |s| s.width = 80.0);
        f.settle();
        f.editor.scene_mut().remove(b);
        f.settle();
        assert_eq!(f.editor.history_status().undo_depth, 4);

        for _ in 0..3 {
            assert!(f.editor.undo());
        }
        assert_eq!(f.token(), origin);
        assert!(!f.editor.can_undo());
        assert!(!f.editor.undo());
    }

    #[test]
    fn test_undo_then_redo_restores_token() {
        let mut f = fixture();
        let a = f.a;
        f.editor.scene_mut().modify_shape(a, |s| s.height = 10.0);
        f.settle();
        let before = f.token();

        assert!(f.editor.undo());
        assert_ne!(f.token(), before);
        assert!(f.editor.redo());
        assert_eq!(f.token(), before);
    }

    #[test]
    fn test_restore_events_are_not_recorded() {
        let mut f = fixture();
        f.editor.scene_mut().add_shape(rect(0.0, 0.0, 5.0, 5.0));
        f.settle();
        assert!(f.editor.undo());
        assert!(!f.editor.history().has_pending_capture());
        assert!(!f.editor.history().is_applying());
        f.clock.advance_ms(1000);
        assert!(!f.editor.tick());
        assert_eq!(f.editor.history_status().redo_depth, 1);
    }

    #[test]
    fn test_mutation_after_undo_clears_redo() {
        let mut f = fixture();
        let a = f.a;
        f.editor.scene_mut().modify_shape(a, |s| s.left = 0.0);
        f.settle();
        assert!(f.editor.undo());
        assert!(f.editor.can_redo());

        f.editor.scene_mut().modify_shape(a, |s| s.top = 0.0);
        f.editor.pump_events();
        assert!(!f.editor.redo());
        assert!(!f.editor.can_redo());
    }

    #[test]
    fn test_undo_flushes_pending_capture() {
        let mut f = fixture();
        let origin = f.token();
        f.editor.scene_mut().add_shape(rect(0.0, 0.0, 5.0, 5.0));
        f.editor.pump_events();
        let changed = f.token();

        assert!(f.editor.undo());
        assert_eq!(f.token(), origin);
        assert!(f.editor.redo());
        assert_eq!(f.token(), changed);
    }

    #[test]
    fn test_history_depth_is_bounded() {
        let mut config = EditorConfig::default();
        config.history.max_depth = 3;
        let mut f = fixture_with(config);
        let a = f.a;
        for i in 0..5 {
            f.editor.scene_mut().modify_shape(a, |s| s.left = i as f64);
            f.settle();
        }
        assert_eq!(f.editor.history_status().undo_depth, 3);
        let oldest = f.editor.history().undo_snapshots().next().unwrap().clone();
        assert!(oldest.token.contains("\"left\":2.0"));
    }

    #[test]
    fn test_committed_path_captures_once() {
        let mut f = fixture();
        let path = Shape::new(
            ShapeKind::Path {
                data: "M 0 0 L 40 40".to_string(),
            },
            Rect::new(0.0, 0.0, 40.0, 40.0),
        );
        let id = f.editor.scene_mut().add_path(path);
        f.editor.pump_events();
        assert!(f.editor.history().has_pending_capture());
        f.settle();
        assert_eq!(f.editor.history_status().undo_depth, 2);
        assert!(f.editor.history().current().unwrap().token.contains(&id.to_string()));

        assert!(f.editor.undo());
        assert!(f.editor.scene().shape(id).is_none());
    }

    #[test]
    fn test_skew_steps_capture_once() {
        let mut f = fixture();
        let a = f.a;
        for i in 1..=5 {
            f.editor.scene_mut().skew_object(a, |s| s.width = 50.0 + i as f64);
            f.editor.pump_events();
            f.clock.advance_ms(16);
        }
        f.settle();
        assert_eq!(f.editor.history_status().undo_depth, 2);
        assert_eq!(f.editor.scene().shape(a).unwrap().width, 55.0);
    }

    #[test]
    fn test_no_net_change_is_not_captured() {
        let mut f = fixture();
        let a = f.a;
        f.editor.scene_mut().modify_shape(a, |_| {});
        f.settle();
        assert_eq!(f.editor.history_status().undo_depth, 1);
    }

    #[test]
    fn test_drag_snaps_and_captures_once() {
        let mut f = fixture();
        let b = f.b;
        {
            let canvas = f.editor.scene_mut();
            canvas.pointer_down();
            canvas.select_by_pointer(&[b]);
            canvas.drag_object(b, Vec2::new(-197.0, 0.0));
        }
        f.editor.pump_events();
        assert_eq!(f.left_top(b), (100.0, 300.0));
        assert!(!f.editor.guides().vertical_lines().is_empty());

        let mut painter = RecordingPainter::default();
        f.editor.render_guides(&mut painter);
        assert!(!painter.lines.is_empty());

        f.clock.advance_ms(16);
        f.editor.scene_mut().drag_object(b, Vec2::new(0.0, 5.0));
        f.editor.pump_events();
        f.editor.scene_mut().release_drag(b);
        f.settle();
        assert_eq!(f.editor.guides().lines().count(), 0);
        f.editor.render_guides(&mut painter);
        assert!(painter.lines.is_empty());
        assert_eq!(f.editor.history_status().undo_depth, 2);
    }

    #[test]
    fn test_lone_object_drag_does_not_snap() {
        let clock = ManualClock::new();
        let mut canvas = Canvas::new();
        canvas.set_canvas_size(2000.0, 2000.0);
        let id = canvas.add_shape(rect(10.0, 10.0, 20.0, 20.0));
        let mut editor = Editor::new(canvas, EditorConfig::default(), Rc::new(clock.clone()));

        editor.scene_mut().drag_object(id, Vec2::new(3.0, 2.0));
        editor.pump_events();
        let shape = editor.scene().shape(id).unwrap();
        assert_eq!((shape.left, shape.top), (13.0, 12.0));
        assert_eq!(editor.guides().lines().count(), 0);
    }

    #[test]
    fn test_delete_in_text_input_is_ignored() {
        let mut f = fixture();
        let a = f.a;
        f.editor.scene_mut().set_selection(&[a]);
        let event = KeyEvent::plain("Delete").in_target(FocusTarget::TextInput);
        assert_eq!(
            f.editor.handle_key(&event),
            Dispatch::Ignored(IgnoreReason::TextEntryFocused)
        );
        assert!(f.editor.scene().shape(a).is_some());

        assert!(f.key("Delete", Modifiers::NONE).is_handled());
        assert!(f.editor.scene().shape(a).is_none());
    }

    #[test]
    fn test_copy_paste_two_objects() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        f.editor.scene_mut().set_selection(&[a, b]);
        assert!(f.key("c", Modifiers::ctrl()).is_handled());
        assert!(f.key("v", Modifiers::ctrl()).is_handled());

        let ids = f.editor.scene().object_ids();
        assert_eq!(ids.len(), 4);
        let pasted = f.editor.scene().selection();
        assert_eq!(pasted, ids[2..].to_vec());
        assert_eq!(f.left_top(pasted[0]), (120.0, 120.0));
        assert_eq!(f.left_top(pasted[1]), (320.0, 320.0));

        // Captured right away, no debounce.
        assert_eq!(f.editor.history_status().undo_depth, 2);
        assert!(!f.editor.history().has_pending_capture());
    }

    #[test]
    fn test_paste_with_empty_clipboard_does_nothing() {
        let mut f = fixture();
        assert!(f.key("v", Modifiers::meta()).is_handled());
        assert_eq!(f.editor.scene().object_ids().len(), 2);
        assert_eq!(f.editor.history_status().undo_depth, 1);
    }

    #[test]
    fn test_group_shortcut_and_undo() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        f.editor.scene_mut().set_selection(&[a, b]);
        f.key("g", Modifiers::ctrl());
        assert_eq!(f.editor.scene().object_ids().len(), 1);
        assert_eq!(f.editor.history_status().undo_depth, 2);

        f.key("z", Modifiers::ctrl());
        assert_eq!(f.editor.scene().object_ids(), vec![a, b]);
        f.key("z", Modifiers::ctrl().with_shift());
        assert_eq!(f.editor.scene().object_ids().len(), 1);
    }

    #[test]
    fn test_nudge_is_recorded_after_debounce() {
        let mut f = fixture();
        let a = f.a;
        f.editor.scene_mut().set_selection(&[a]);
        f.key("ArrowRight", Modifiers::NONE);
        f.key("ArrowRight", Modifiers::shift());
        assert_eq!(f.left_top(a), (111.0, 100.0));
        assert!(f.editor.history().has_pending_capture());
        f.settle();
        assert_eq!(f.editor.history_status().undo_depth, 2);
    }

    #[test]
    fn test_disabled_shortcuts() {
        let mut config = EditorConfig::default();
        config.shortcuts.enabled = false;
        let mut f = fixture_with(config);
        assert_eq!(
            f.key("a", Modifiers::ctrl()),
            Dispatch::Ignored(IgnoreReason::Disabled)
        );
        f.editor.shortcuts_mut().set_enabled(true);
        assert!(f.key("a", Modifiers::ctrl()).is_handled());
        assert_eq!(f.editor.scene().selection().len(), 2);
    }

    #[test]
    fn test_custom_shortcut_replaces_default() {
        let mut f = fixture();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        f.editor.shortcuts_mut().register(Shortcut::new(
            Chord::ctrl("z"),
            "Count",
            Category::Custom,
            move |_: &mut EditorContext<Canvas>| counter.set(counter.get() + 1),
        ));
        let a = f.a;
        f.editor.scene_mut().modify_shape(a, |s| s.left = 0.0);
        f.settle();

        f.key("z", Modifiers::ctrl());
        assert_eq!(hits.get(), 1);
        assert_eq!(f.left_top(a), (0.0, 100.0));
    }

    #[test]
    fn test_history_listener() {
        let mut f = fixture();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        f.editor.on_history_change(move |_| seen.set(seen.get() + 1));

        let a = f.a;
        f.editor.scene_mut().modify_shape(a, |s| s.left = 0.0);
        f.settle();
        assert_eq!(calls.get(), 1);
        f.editor.undo();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_align_records_change() {
        let mut f = fixture();
        let (a, b) = (f.a, f.b);
        f.editor.scene_mut().set_selection(&[a, b]);
        assert!(f.editor.align(Alignment::Top));
        assert_eq!(f.left_top(b).1, 100.0);
        f.settle();
        assert_eq!(f.editor.history_status().undo_depth, 2);
    }
}
