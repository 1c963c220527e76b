//! DrawDeck Core Library
//!
//! Platform-agnostic editing core for the DrawDeck vector editor: snapshot
//! based undo/redo, alignment guides with snapping, and keyboard shortcuts,
//! wired together by [`Editor`] over any scene that implements the
//! [`scene`] traits.

pub mod actions;
pub mod camera;
pub mod canvas;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod history;
pub mod input;
pub mod scene;
pub mod scheduler;
pub mod shapes;
pub mod shortcuts;
pub mod snap;
pub mod storage;

pub use camera::Camera;
pub use canvas::Canvas;
pub use clipboard::{ClipboardBuffer, ClipboardProvider};
pub use config::EditorConfig;
pub use editor::{Editor, EditorContext};
pub use history::{HistoryManager, HistoryStatus, PersistentHistory, Snapshot};
pub use input::{FocusTarget, KeyEvent, Modifiers};
pub use scene::{ObjectId, Scene, SceneEvent};
pub use scheduler::{Clock, ManualClock, SystemClock};
pub use shortcuts::{Chord, Dispatch, Shortcut, ShortcutDispatcher};
pub use snap::{AlignmentGuides, GuideOptions, GuidePainter, SnapLine};
