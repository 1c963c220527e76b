//! Keyboard shortcut registry and dispatch.
//!
//! Shortcuts are keyed by the canonical form of their chord: the present
//! modifiers in the order ctrl, meta, shift, alt, then the lowercased key,
//! joined by `+` ("ctrl+shift+z"). Registering a chord that is already bound
//! replaces the earlier binding.

use crate::input::{KeyEvent, Modifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A key plus modifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chord {
    pub key: String,
    pub modifiers: Modifiers,
}

impl Chord {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::ctrl())
    }

    pub fn meta(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::meta())
    }

    pub fn shift(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::shift())
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self::new(event.key.clone(), event.modifiers)
    }

    /// Canonical lookup key, e.g. "ctrl+shift+z".
    pub fn canonical(&self) -> String {
        let mut parts = Vec::with_capacity(5);
        if self.modifiers.ctrl {
            parts.push("ctrl".to_string());
        }
        if self.modifiers.meta {
            parts.push("meta".to_string());
        }
        if self.modifiers.shift {
            parts.push("shift".to_string());
        }
        if self.modifiers.alt {
            parts.push("alt".to_string());
        }
        parts.push(self.key.to_lowercase());
        parts.join("+")
    }

    /// Parse "ctrl+shift+z" style text. Modifier names are case-insensitive
    /// and may appear in any order; exactly one non-modifier key must end the
    /// chord.
    pub fn parse(text: &str) -> Option<Self> {
        let mut modifiers = Modifiers::NONE;
        let mut tokens: Vec<&str> = text.split('+').map(str::trim).collect();
        let key = tokens.pop().filter(|k| !k.is_empty())?;
        for token in tokens {
            match token.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "meta" | "cmd" | "command" | "super" => modifiers.meta = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                _ => return None,
            }
        }
        if matches!(
            key.to_lowercase().as_str(),
            "ctrl" | "control" | "meta" | "cmd" | "command" | "super" | "shift" | "alt" | "option"
        ) {
            return None;
        }
        Some(Self::new(key, modifiers))
    }

    /// Format for display (e.g., "Ctrl+Shift+Z").
    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if self.modifiers.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.meta {
            parts.push("Cmd".to_string());
        }
        if self.modifiers.shift {
            parts.push("Shift".to_string());
        }
        if self.modifiers.alt {
            parts.push("Alt".to_string());
        }
        let key = if self.key.chars().count() == 1 {
            self.key.to_uppercase()
        } else {
            self.key.clone()
        };
        parts.push(key);
        parts.join("+")
    }
}

impl PartialEq for Chord {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Chord {}

impl Hash for Chord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Group a shortcut is listed under in help screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Clipboard,
    Edit,
    Move,
    Transform,
    Arrange,
    Select,
    Custom,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Clipboard => "Clipboard",
            Category::Edit => "Edit",
            Category::Move => "Move",
            Category::Transform => "Transform",
            Category::Arrange => "Arrange",
            Category::Select => "Select",
            Category::Custom => "Custom",
        }
    }
}

/// Callback run against the dispatch context.
pub type ShortcutAction<C> = Rc<dyn Fn(&mut C)>;

/// A keyboard shortcut definition.
pub struct Shortcut<C> {
    pub chord: Chord,
    pub action: ShortcutAction<C>,
    pub description: String,
    pub category: Category,
}

impl<C> Shortcut<C> {
    pub fn new(
        chord: Chord,
        description: impl Into<String>,
        category: Category,
        action: impl Fn(&mut C) + 'static,
    ) -> Self {
        Self {
            chord,
            action: Rc::new(action),
            description: description.into(),
            category,
        }
    }

    pub fn canonical(&self) -> String {
        self.chord.canonical()
    }
}

impl<C> Clone for Shortcut<C> {
    fn clone(&self) -> Self {
        Self {
            chord: self.chord.clone(),
            action: Rc::clone(&self.action),
            description: self.description.clone(),
            category: self.category,
        }
    }
}

impl<C> fmt::Debug for Shortcut<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shortcut")
            .field("chord", &self.chord.canonical())
            .field("description", &self.description)
            .field("category", &self.category)
            .finish()
    }
}

/// Anything that names a registered shortcut.
pub struct ShortcutKey(String);

impl From<&str> for ShortcutKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ShortcutKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&Chord> for ShortcutKey {
    fn from(chord: &Chord) -> Self {
        Self(chord.canonical())
    }
}

impl From<Chord> for ShortcutKey {
    fn from(chord: Chord) -> Self {
        Self(chord.canonical())
    }
}

/// Why a key press was left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Disabled,
    TextEntryFocused,
    Unbound,
}

/// Outcome of [`ShortcutDispatcher::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// An action ran; the host should prevent the default action and stop
    /// propagation.
    Handled,
    Ignored(IgnoreReason),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }
}

/// Maps chords to actions over a context `C`.
pub struct ShortcutDispatcher<C> {
    /// Registration order; canonical keys are unique.
    shortcuts: Vec<Shortcut<C>>,
    enabled: bool,
}

impl<C> Default for ShortcutDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ShortcutDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutDispatcher")
            .field("shortcuts", &self.shortcuts)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<C> ShortcutDispatcher<C> {
    pub fn new() -> Self {
        Self {
            shortcuts: Vec::new(),
            enabled: true,
        }
    }

    /// Bind a shortcut, returning the binding it replaced. A replaced binding
    /// keeps its position in the listing.
    pub fn register(&mut self, shortcut: Shortcut<C>) -> Option<Shortcut<C>> {
        let key = shortcut.canonical();
        match self.shortcuts.iter().position(|s| s.canonical() == key) {
            Some(index) => Some(std::mem::replace(&mut self.shortcuts[index], shortcut)),
            None => {
                self.shortcuts.push(shortcut);
                None
            }
        }
    }

    pub fn register_all(&mut self, shortcuts: impl IntoIterator<Item = Shortcut<C>>) {
        for shortcut in shortcuts {
            self.register(shortcut);
        }
    }

    /// Remove a binding by canonical string or chord.
    pub fn unregister(&mut self, key: impl Into<ShortcutKey>) -> Option<Shortcut<C>> {
        let ShortcutKey(key) = key.into();
        let index = self.shortcuts.iter().position(|s| s.canonical() == key)?;
        Some(self.shortcuts.remove(index))
    }

    pub fn get(&self, key: impl Into<ShortcutKey>) -> Option<&Shortcut<C>> {
        let ShortcutKey(key) = key.into();
        self.shortcuts.iter().find(|s| s.canonical() == key)
    }

    /// All bindings in registration order.
    pub fn shortcuts(&self) -> &[Shortcut<C>] {
        &self.shortcuts
    }

    pub fn clear(&mut self) {
        self.shortcuts.clear();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run the action bound to `event`, if any.
    pub fn dispatch(&self, event: &KeyEvent, context: &mut C) -> Dispatch {
        if !self.enabled {
            return Dispatch::Ignored(IgnoreReason::Disabled);
        }
        if event.target.is_text_entry() {
            return Dispatch::Ignored(IgnoreReason::TextEntryFocused);
        }
        let key = Chord::from_event(event).canonical();
        let Some(shortcut) = self.shortcuts.iter().find(|s| s.canonical() == key) else {
            return Dispatch::Ignored(IgnoreReason::Unbound);
        };
        log::debug!("Shortcut {} -> {}", key, shortcut.description);
        (shortcut.action)(context);
        Dispatch::Handled
    }
}

/// Step sizes for the built-in shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutConfig {
    pub enabled: bool,
    pub nudge_step: f64,
    pub nudge_step_large: f64,
    /// Degrees.
    pub rotate_step: f64,
    pub rotate_step_large: f64,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            rotate_step: 1.0,
            rotate_step_large: 10.0,
        }
    }
}

/// Commands the built-in shortcuts invoke.
pub trait EditorCommands {
    fn copy(&mut self);
    fn paste(&mut self);
    fn delete_selection(&mut self);
    fn undo(&mut self);
    fn redo(&mut self);
    fn toggle_group(&mut self);
    fn nudge(&mut self, dx: f64, dy: f64);
    fn rotate(&mut self, degrees: f64);
    fn bring_forward(&mut self);
    fn send_backward(&mut self);
    fn bring_to_front(&mut self);
    fn send_to_back(&mut self);
    fn select_all(&mut self);
}

/// The built-in shortcut table.
pub fn default_shortcuts<C: EditorCommands + 'static>(config: &ShortcutConfig) -> Vec<Shortcut<C>> {
    use Category::*;

    let small = config.nudge_step;
    let large = config.nudge_step_large;
    let rot = config.rotate_step;
    let rot_large = config.rotate_step_large;

    let mut shortcuts = vec![
        Shortcut::new(Chord::ctrl("c"), "Copy selected objects", Clipboard, |c: &mut C| c.copy()),
        Shortcut::new(Chord::meta("c"), "Copy selected objects (Mac)", Clipboard, |c: &mut C| c.copy()),
        Shortcut::new(Chord::ctrl("v"), "Paste objects from clipboard", Clipboard, |c: &mut C| c.paste()),
        Shortcut::new(Chord::meta("v"), "Paste objects from clipboard (Mac)", Clipboard, |c: &mut C| c.paste()),
        Shortcut::new(Chord::key("Delete"), "Delete selected objects", Edit, |c: &mut C| c.delete_selection()),
        Shortcut::new(Chord::key("Backspace"), "Delete selected objects", Edit, |c: &mut C| c.delete_selection()),
        Shortcut::new(Chord::ctrl("z"), "Undo last action", Edit, |c: &mut C| c.undo()),
        Shortcut::new(Chord::meta("z"), "Undo last action (Mac)", Edit, |c: &mut C| c.undo()),
        Shortcut::new(Chord::ctrl("y"), "Redo last action", Edit, |c: &mut C| c.redo()),
        Shortcut::new(Chord::meta("y"), "Redo last action (Mac)", Edit, |c: &mut C| c.redo()),
        Shortcut::new(Chord::ctrl("z").with_shift(), "Redo last action", Edit, |c: &mut C| c.redo()),
        Shortcut::new(Chord::meta("z").with_shift(), "Redo last action (Mac)", Edit, |c: &mut C| c.redo()),
        Shortcut::new(Chord::ctrl("g"), "Group/ungroup selection", Edit, |c: &mut C| c.toggle_group()),
    ];

    for (key, dx, dy, name) in [
        ("ArrowLeft", -1.0, 0.0, "left"),
        ("ArrowRight", 1.0, 0.0, "right"),
        ("ArrowUp", 0.0, -1.0, "up"),
        ("ArrowDown", 0.0, 1.0, "down"),
    ] {
        shortcuts.push(Shortcut::new(
            Chord::key(key),
            format!("Move selection {name} ({small}px)"),
            Move,
            move |c: &mut C| c.nudge(dx * small, dy * small),
        ));
        shortcuts.push(Shortcut::new(
            Chord::shift(key),
            format!("Move selection {name} ({large}px)"),
            Move,
            move |c: &mut C| c.nudge(dx * large, dy * large),
        ));
    }

    for (key, sign, name) in [("ArrowLeft", -1.0, "left"), ("ArrowRight", 1.0, "right")] {
        shortcuts.push(Shortcut::new(
            Chord::ctrl(key),
            format!("Rotate selection {name} ({rot}°)"),
            Transform,
            move |c: &mut C| c.rotate(sign * rot),
        ));
        shortcuts.push(Shortcut::new(
            Chord::ctrl(key).with_shift(),
            format!("Rotate selection {name} ({rot_large}°)"),
            Transform,
            move |c: &mut C| c.rotate(sign * rot_large),
        ));
    }

    shortcuts.extend([
        Shortcut::new(Chord::ctrl("ArrowUp"), "Bring selection forward", Arrange, |c: &mut C| c.bring_forward()),
        Shortcut::new(Chord::ctrl("ArrowDown"), "Send selection backward", Arrange, |c: &mut C| c.send_backward()),
        Shortcut::new(Chord::ctrl("ArrowUp").with_shift(), "Bring selection to front", Arrange, |c: &mut C| {
            c.bring_to_front()
        }),
        Shortcut::new(Chord::ctrl("ArrowDown").with_shift(), "Send selection to back", Arrange, |c: &mut C| {
            c.send_to_back()
        }),
        Shortcut::new(Chord::ctrl("a"), "Select all objects", Select, |c: &mut C| c.select_all()),
        Shortcut::new(Chord::meta("a"), "Select all objects (Mac)", Select, |c: &mut C| c.select_all()),
    ]);

    shortcuts
}
