//! Snapshot-based undo/redo.
//!
//! [`HistoryManager`] keeps whole-scene tokens on two stacks. Captures are
//! debounced so a drag that fires many mutation events lands as one entry.
//! [`PersistentHistory`] is the key/value backed variant.

mod persistent;

pub use persistent::{
    HISTORY_INDEX_KEY, HISTORY_STORAGE_KEY, HistoryEntry, ObjectSummary, PERSISTENT_HISTORY_LIMIT,
    PersistentHistory,
};

use crate::scene::SceneSerializer;
use crate::scheduler::Timer;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of snapshots kept on the undo stack.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Quiet period after the last mutation before a snapshot is taken.
pub const CAPTURE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Delay before the initial snapshot, letting the host scene settle.
pub const INITIAL_CAPTURE_DELAY: Duration = Duration::from_millis(100);

/// History errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History already initialized")]
    AlreadyInitialized,
}

/// History tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_depth: usize,
    pub debounce_ms: u64,
    pub initial_delay_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            debounce_ms: CAPTURE_DEBOUNCE.as_millis() as u64,
            initial_delay_ms: INITIAL_CAPTURE_DELAY.as_millis() as u64,
        }
    }
}

/// A captured scene state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Opaque serialized scene.
    pub token: String,
    /// Capture time in milliseconds.
    pub timestamp: u64,
}

/// Stack depths and capability flags, passed to change listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStatus {
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    pub applying: bool,
}

type ChangeListener = Box<dyn FnMut(HistoryStatus)>;

/// Two-stack undo/redo over scene tokens.
///
/// The host forwards every scene mutation to [`record_mutation`] and calls
/// [`poll`] from its tick. After a successful [`undo`] or [`redo`] the
/// manager stays in the applying state, ignoring mutations raised by the
/// restore itself, until the host calls [`finish_restore`].
///
/// [`record_mutation`]: HistoryManager::record_mutation
/// [`poll`]: HistoryManager::poll
/// [`undo`]: HistoryManager::undo
/// [`redo`]: HistoryManager::redo
/// [`finish_restore`]: HistoryManager::finish_restore
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_depth: usize,
    debounce: Duration,
    initial_delay: Duration,
    pending_capture: Timer,
    initial_capture: Timer,
    initialized: bool,
    applying: bool,
    listener: Option<ChangeListener>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("status", &self.status())
            .field("pending_capture", &self.pending_capture)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl HistoryManager {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: config.max_depth.max(1),
            debounce: Duration::from_millis(config.debounce_ms),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            pending_capture: Timer::new(),
            initial_capture: Timer::new(),
            initialized: false,
            applying: false,
            listener: None,
        }
    }

    /// Register the callback fired after every capture, undo and redo.
    pub fn set_change_listener(&mut self, listener: impl FnMut(HistoryStatus) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Schedule the initial snapshot. Allowed once per session.
    pub fn initialize(&mut self, now: Duration) -> Result<(), HistoryError> {
        if self.initialized {
            return Err(HistoryError::AlreadyInitialized);
        }
        self.initialized = true;
        self.initial_capture.arm(now, self.initial_delay);
        log::info!("History initialized (max depth {})", self.max_depth);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Note a scene mutation. Restarts the quiet window.
    ///
    /// Returns false when the mutation was ignored because a restore is
    /// being applied.
    pub fn record_mutation(&mut self, now: Duration) -> bool {
        if self.applying {
            log::debug!("Ignoring mutation raised while applying history");
            return false;
        }
        self.pending_capture.arm(now, self.debounce);
        true
    }

    /// Whether a debounced capture is waiting for its quiet window.
    pub fn has_pending_capture(&self) -> bool {
        self.pending_capture.is_armed()
    }

    /// Fire due timers. Returns true if a snapshot was pushed.
    pub fn poll<S: SceneSerializer + ?Sized>(&mut self, now: Duration, scene: &S) -> bool {
        let mut captured = false;
        if self.initial_capture.fire(now) {
            captured |= self.capture(scene, now);
        }
        if self.pending_capture.fire(now) {
            captured |= self.capture(scene, now);
        }
        captured
    }

    /// Capture right away, superseding any pending debounced capture.
    pub fn save_current_state_immediately<S: SceneSerializer + ?Sized>(
        &mut self,
        scene: &S,
        now: Duration,
    ) -> bool {
        self.pending_capture.cancel();
        self.capture(scene, now)
    }

    fn flush_pending<S: SceneSerializer + ?Sized>(&mut self, scene: &S, now: Duration) {
        if self.pending_capture.is_armed() {
            self.pending_capture.cancel();
            self.capture(scene, now);
        }
    }

    fn capture<S: SceneSerializer + ?Sized>(&mut self, scene: &S, now: Duration) -> bool {
        if self.applying {
            return false;
        }
        let token = match scene.to_token() {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Failed to capture history snapshot: {}", e);
                return false;
            }
        };
        if self.undo_stack.back().is_some_and(|top| top.token == token) {
            return false;
        }

        self.undo_stack.push_back(Snapshot {
            token,
            timestamp: now.as_millis() as u64,
        });
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        self.notify();
        true
    }

    /// Step back one snapshot. The initial state is never undone.
    pub fn undo<S: SceneSerializer + ?Sized>(&mut self, scene: &mut S, now: Duration) -> bool {
        if self.applying {
            return false;
        }
        self.flush_pending(&*scene, now);
        if self.undo_stack.len() <= 1 {
            return false;
        }
        let Some(current) = self.undo_stack.pop_back() else {
            return false;
        };
        let Some(target) = self.undo_stack.back() else {
            self.undo_stack.push_back(current);
            return false;
        };

        self.applying = true;
        match scene.load_token(&target.token) {
            Ok(()) => {
                self.redo_stack.push(current);
                true
            }
            Err(e) => {
                log::warn!("Undo failed to restore snapshot: {}", e);
                self.undo_stack.push_back(current);
                self.applying = false;
                false
            }
        }
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo<S: SceneSerializer + ?Sized>(&mut self, scene: &mut S, now: Duration) -> bool {
        if self.applying {
            return false;
        }
        self.flush_pending(&*scene, now);
        let Some(target) = self.redo_stack.pop() else {
            return false;
        };

        self.applying = true;
        match scene.load_token(&target.token) {
            Ok(()) => {
                self.undo_stack.push_back(target);
                while self.undo_stack.len() > self.max_depth {
                    self.undo_stack.pop_front();
                }
                true
            }
            Err(e) => {
                log::warn!("Redo failed to restore snapshot: {}", e);
                self.redo_stack.push(target);
                self.applying = false;
                false
            }
        }
    }

    /// End the applying state entered by a successful undo or redo.
    pub fn finish_restore(&mut self) {
        if self.applying {
            self.applying = false;
            self.notify();
        }
    }

    pub fn is_applying(&self) -> bool {
        self.applying
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all snapshots and schedule a fresh initial capture.
    pub fn clear_history(&mut self, now: Duration) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending_capture.cancel();
        self.initial_capture.arm(now, self.initial_delay);
        log::info!("History cleared");
        self.notify();
    }

    /// Cancel all scheduled captures.
    pub fn dispose(&mut self) {
        self.pending_capture.cancel();
        self.initial_capture.cancel();
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            undo_depth: self.undo_stack.len(),
            redo_depth: self.redo_stack.len(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            applying: self.applying,
        }
    }

    /// Snapshot on top of the undo stack.
    pub fn current(&self) -> Option<&Snapshot> {
        self.undo_stack.back()
    }

    pub fn undo_snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.undo_stack.iter()
    }

    fn notify(&mut self) {
        let status = self.status();
        if let Some(listener) = self.listener.as_mut() {
            listener(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneError, SceneResult};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scene whose whole state is a string.
    #[derive(Default)]
    struct TextScene {
        state: String,
        fail_load: bool,
    }

    impl SceneSerializer for TextScene {
        fn to_token(&self) -> SceneResult<String> {
            Ok(self.state.clone())
        }

        fn load_token(&mut self, token: &str) -> SceneResult<()> {
            if self.fail_load {
                return Err(SceneError::Deserialization("corrupt".into()));
            }
            self.state = token.to_string();
            Ok(())
        }

        fn export_objects(&self, _ids: &[crate::scene::ObjectId]) -> SceneResult<Vec<serde_json::Value>> {
            Ok(Vec::new())
        }

        fn import_objects(
            &mut self,
            _objects: Vec<serde_json::Value>,
        ) -> SceneResult<Vec<crate::scene::ObjectId>> {
            Ok(Vec::new())
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn ready(scene: &TextScene) -> HistoryManager {
        let mut history = HistoryManager::default();
        history.initialize(ms(0)).unwrap();
        assert!(history.poll(ms(100), scene));
        history
    }

    /// Mutate, then let the debounce window pass.
    fn mutate(history: &mut HistoryManager, scene: &mut TextScene, state: &str, at: u64) {
        scene.state = state.to_string();
        history.record_mutation(ms(at));
        history.poll(ms(at + 300), &*scene);
    }

    #[test]
    fn test_initialize_once() {
        let mut history = HistoryManager::default();
        assert!(history.initialize(ms(0)).is_ok());
        assert_eq!(history.initialize(ms(1)), Err(HistoryError::AlreadyInitialized));
    }

    #[test]
    fn test_initial_capture_waits_for_delay() {
        let scene = TextScene::default();
        let mut history = HistoryManager::default();
        history.initialize(ms(0)).unwrap();
        assert!(!history.poll(ms(99), &scene));
        assert!(history.poll(ms(100), &scene));
        assert_eq!(history.status().undo_depth, 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_burst_collapses_into_one_capture() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        for i in 0..10 {
            scene.state = format!("drag {i}");
            history.record_mutation(ms(200 + i * 50));
            assert!(!history.poll(ms(200 + i * 50), &scene));
        }
        // Last mutation at 650 re-arms the timer for 950.
        assert!(!history.poll(ms(949), &scene));
        assert!(history.poll(ms(950), &scene));
        assert_eq!(history.status().undo_depth, 2);
        assert_eq!(history.current().map(|s| s.token.as_str()), Some("drag 9"));
    }

    #[test]
    fn test_n_mutations_then_n_undos_returns_to_origin() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        let origin = scene.to_token().unwrap();
        for i in 0..5 {
            mutate(&mut history, &mut scene, &format!("s{i}"), 1000 * (i + 1));
        }
        for _ in 0..5 {
            assert!(history.undo(&mut scene, ms(10_000)));
            history.finish_restore();
        }
        assert_eq!(scene.to_token().unwrap(), origin);
        assert!(!history.undo(&mut scene, ms(10_000)));
    }

    #[test]
    fn test_undo_then_redo_is_inverse() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        mutate(&mut history, &mut scene, "a", 1000);
        mutate(&mut history, &mut scene, "b", 2000);
        let before = scene.to_token().unwrap();
        assert!(history.undo(&mut scene, ms(3000)));
        history.finish_restore();
        assert_eq!(scene.state, "a");
        assert!(history.redo(&mut scene, ms(3000)));
        history.finish_restore();
        assert_eq!(scene.to_token().unwrap(), before);
    }

    #[test]
    fn test_mutation_after_undo_clears_redo() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        mutate(&mut history, &mut scene, "a", 1000);
        assert!(history.undo(&mut scene, ms(2000)));
        history.finish_restore();
        assert!(history.can_redo());

        // Still inside the debounce window when redo is requested.
        scene.state = "b".into();
        history.record_mutation(ms(2100));
        assert!(!history.redo(&mut scene, ms(2150)));
        assert!(!history.can_redo());
        assert_eq!(scene.state, "b");
    }

    #[test]
    fn test_stack_bound_evicts_oldest() {
        let mut scene = TextScene::default();
        let mut history = HistoryManager::new(HistoryConfig {
            max_depth: 3,
            ..HistoryConfig::default()
        });
        history.initialize(ms(0)).unwrap();
        history.poll(ms(100), &scene);
        for i in 0..5 {
            mutate(&mut history, &mut scene, &format!("s{i}"), 1000 * (i + 1));
        }
        let tokens: Vec<&str> = history.undo_snapshots().map(|s| s.token.as_str()).collect();
        assert_eq!(tokens, vec!["s2", "s3", "s4"]);
    }

    #[test]
    fn test_identical_capture_is_noop() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        mutate(&mut history, &mut scene, "a", 1000);
        let depth = history.status().undo_depth;
        history.record_mutation(ms(2000));
        assert!(!history.poll(ms(2300), &scene));
        assert!(!history.save_current_state_immediately(&scene, ms(2400)));
        assert_eq!(history.status().undo_depth, depth);
    }

    #[test]
    fn test_mutations_ignored_while_applying() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        mutate(&mut history, &mut scene, "a", 1000);
        assert!(history.undo(&mut scene, ms(2000)));
        assert!(history.is_applying());
        assert!(!history.record_mutation(ms(2001)));
        assert!(!history.poll(ms(5000), &scene));
        history.finish_restore();
        assert!(!history.is_applying());
        assert!(history.can_redo());
    }

    #[test]
    fn test_failed_restore_leaves_stacks() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        mutate(&mut history, &mut scene, "a", 1000);
        scene.fail_load = true;
        let before = history.status();
        assert!(!history.undo(&mut scene, ms(2000)));
        assert_eq!(history.status(), before);
        assert!(!history.is_applying());
    }

    #[test]
    fn test_immediate_save_cancels_pending() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        scene.state = "pasted".into();
        history.record_mutation(ms(1000));
        assert!(history.save_current_state_immediately(&scene, ms(1001)));
        assert!(!history.has_pending_capture());
        assert_eq!(history.status().undo_depth, 2);
    }

    #[test]
    fn test_listener_sees_capture_undo_redo() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        history.set_change_listener(move |status| sink.borrow_mut().push(status));

        mutate(&mut history, &mut scene, "a", 1000);
        history.undo(&mut scene, ms(2000));
        history.finish_restore();
        history.redo(&mut scene, ms(3000));
        history.finish_restore();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].can_undo);
        assert!(seen[1].can_redo && !seen[1].can_undo);
        assert!(seen[2].can_undo && !seen[2].can_redo);
    }

    #[test]
    fn test_clear_history_reschedules_initial_capture() {
        let mut scene = TextScene::default();
        let mut history = ready(&scene);
        mutate(&mut history, &mut scene, "a", 1000);
        history.clear_history(ms(2000));
        assert_eq!(history.status().undo_depth, 0);
        assert!(history.poll(ms(2100), &scene));
        assert_eq!(history.current().map(|s| s.token.as_str()), Some("a"));
    }
}
