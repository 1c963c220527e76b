//! Index-based history persisted through a [`KeyValueStore`].

use crate::canvas::Canvas;
use crate::scene::{SceneResult, SceneSerializer};
use crate::storage::{KeyValueStore, StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Key holding the JSON array of entries.
pub const HISTORY_STORAGE_KEY: &str = "drawdeck-canvas-history";

/// Key holding the current index as a decimal integer (`-1` when empty).
pub const HISTORY_INDEX_KEY: &str = "drawdeck-canvas-history-index";

/// Maximum number of persisted entries.
pub const PERSISTENT_HISTORY_LIMIT: usize = 50;

/// Listing entry shown next to a history state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One persisted history state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Opaque serialized scene.
    pub canvas_state: String,
    #[serde(default)]
    pub objects: Vec<ObjectSummary>,
}

impl HistoryEntry {
    pub fn new(canvas_state: impl Into<String>) -> Self {
        Self {
            canvas_state: canvas_state.into(),
            objects: Vec::new(),
        }
    }

    /// Capture a canvas together with its object listing.
    pub fn from_canvas(canvas: &Canvas) -> SceneResult<Self> {
        let objects = canvas
            .document
            .shapes_ordered()
            .enumerate()
            .map(|(i, shape)| ObjectSummary {
                id: shape.id.to_string(),
                name: format!("{} {}", shape.kind.name(), i + 1),
                kind: shape.kind.name().to_string(),
            })
            .collect();
        Ok(Self {
            canvas_state: canvas.to_token()?,
            objects,
        })
    }
}

/// Linear history with a movable cursor, persisted on every change.
///
/// Saving after an undo drops the entries past the cursor. When the store
/// reports a full quota the oldest half is dropped and the write retried
/// once.
pub struct PersistentHistory<K: KeyValueStore> {
    store: K,
    entries: Vec<HistoryEntry>,
    index: Option<usize>,
    max_size: usize,
    restoring: bool,
}

impl<K: KeyValueStore> PersistentHistory<K> {
    /// Load history from `store`. Unreadable data yields an empty history.
    pub fn load(store: K, max_size: usize) -> Self {
        let mut history = Self {
            store,
            entries: Vec::new(),
            index: None,
            max_size: max_size.max(1),
            restoring: false,
        };
        if let Err(e) = history.load_from_store() {
            log::warn!("Discarding unreadable history: {}", e);
            history.entries.clear();
            history.index = None;
        }
        history
    }

    fn load_from_store(&mut self) -> StoreResult<()> {
        if let Some(data) = self.store.get(HISTORY_STORAGE_KEY)? {
            self.entries = serde_json::from_str(&data)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
        }
        let raw_index = match self.store.get(HISTORY_INDEX_KEY)? {
            Some(data) => data
                .trim()
                .parse::<i64>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            None => -1,
        };
        let last = self.entries.len() as i64 - 1;
        self.index = usize::try_from(raw_index.min(last)).ok();
        Ok(())
    }

    fn write(&mut self) -> StoreResult<()> {
        let data = serde_json::to_string(&self.entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(HISTORY_STORAGE_KEY, &data)?;
        let index = self.index.map_or(-1, |i| i as i64);
        self.store.set(HISTORY_INDEX_KEY, &index.to_string())
    }

    fn persist(&mut self) {
        match self.write() {
            Ok(()) => {}
            Err(StoreError::QuotaExceeded) => {
                log::warn!("History storage full, dropping old entries");
                self.clear_old_history();
                if let Err(e) = self.write() {
                    log::warn!("Failed to persist history after trimming: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to persist history: {}", e),
        }
    }

    /// Keep only the newest half of the entries.
    fn clear_old_history(&mut self) {
        let target = self.max_size / 2;
        let excess = self.entries.len().saturating_sub(target);
        if excess > 0 {
            self.entries.drain(..excess);
            self.index = self.index.and_then(|i| i.checked_sub(excess));
        }
    }

    /// Append a state after the cursor.
    ///
    /// Returns false while restoring or when `entry` matches the current
    /// state.
    pub fn save_state(&mut self, entry: HistoryEntry) -> bool {
        if self.restoring {
            return false;
        }
        if self
            .current()
            .is_some_and(|current| current.canvas_state == entry.canvas_state)
        {
            return false;
        }

        self.entries.truncate(self.index.map_or(0, |i| i + 1));
        self.entries.push(entry);
        if self.entries.len() > self.max_size {
            self.entries.remove(0);
        }
        self.index = Some(self.entries.len() - 1);
        self.persist();
        true
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.index.and_then(|i| self.entries.get(i))
    }

    /// Move the cursor back and return the state to apply.
    ///
    /// The history stays in the restoring state until
    /// [`finish_restore`](Self::finish_restore).
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.restoring = true;
        self.index = self.index.map(|i| i - 1);
        self.persist();
        self.current().cloned()
    }

    /// Move the cursor forward and return the state to apply.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.restoring = true;
        self.index = Some(self.index.map_or(0, |i| i + 1));
        self.persist();
        self.current().cloned()
    }

    pub fn finish_restore(&mut self) {
        self.restoring = false;
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        match self.index {
            Some(i) => i + 1 < self.entries.len(),
            None => !self.entries.is_empty(),
        }
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Drop all entries and both storage keys.
    pub fn clear_history(&mut self) {
        self.entries.clear();
        self.index = None;
        for key in [HISTORY_STORAGE_KEY, HISTORY_INDEX_KEY] {
            if let Err(e) = self.store.remove(key) {
                log::warn!("Failed to remove {}: {}", key, e);
            }
        }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn into_store(self) -> K {
        self.store
    }
}
