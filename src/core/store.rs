//! Editor state for one open paper
//!
//! [`EditorStore`] is a cheap, cloneable handle. Every view, debounce task
//! and save path that touches a paper receives the handle explicitly, so two
//! open papers never share state.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use super::editor_config::{EditorConfig, EditorConfigPatch};

/// Which surface renders the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    #[default]
    Edit,
    Preview,
}

impl Surface {
    /// The other surface
    pub fn toggled(self) -> Self {
        match self {
            Surface::Edit => Surface::Preview,
            Surface::Preview => Surface::Edit,
        }
    }
}

/// Point-in-time copy of the store
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub content: String,
    pub revision: u64,
    pub dirty: bool,
    pub surface: Surface,
    pub config: EditorConfig,
}

/// Content captured when a save starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePoint {
    /// Text being persisted
    pub content: String,
    /// Content revision the text belongs to
    pub revision: u64,
}

#[derive(Debug)]
struct EditorState {
    content: String,
    saved: String,
    dirty: bool,
    surface: Surface,
    config: EditorConfig,
    /// Bumped on every accepted content change
    revision: u64,
}

struct Inner {
    state: RwLock<EditorState>,
    changes: watch::Sender<u64>,
}

/// Shared handle to one paper's editing state
#[derive(Clone)]
pub struct EditorStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EditorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorStore")
            .field("state", &*self.read())
            .finish()
    }
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorStore {
    /// Create an empty, clean store
    pub fn new(config: EditorConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(EditorState {
                    content: String::new(),
                    saved: String::new(),
                    dirty: false,
                    surface: Surface::Edit,
                    config,
                    revision: 0,
                }),
                changes,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EditorState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EditorState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.changes.send_modify(|version| *version += 1);
    }

    /// Replace the document with text loaded from storage; the result is clean
    pub fn load(&self, text: impl Into<String>) {
        {
            let mut state = self.write();
            let text = text.into();
            state.saved = text.clone();
            state.content = text;
            state.dirty = false;
            state.revision += 1;
        }
        self.notify();
    }

    /// Replace the document content.
    ///
    /// The document is dirty unless `text` equals the last saved text.
    pub fn update_content(&self, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.write();
            if state.content == text {
                return;
            }
            state.dirty = text != state.saved;
            state.content = text;
            state.revision += 1;
        }
        self.notify();
    }

    /// Flip between the edit and preview surfaces
    pub fn toggle_preview(&self) -> Surface {
        let surface = {
            let mut state = self.write();
            state.surface = state.surface.toggled();
            state.surface
        };
        self.notify();
        surface
    }

    /// Merge a partial configuration
    pub fn update_config(&self, patch: &EditorConfigPatch) {
        if patch.is_empty() {
            return;
        }
        self.write().config.merge(patch);
        self.notify();
    }

    /// Capture the content a save is about to persist
    pub fn save_point(&self) -> SavePoint {
        let state = self.read();
        SavePoint {
            content: state.content.clone(),
            revision: state.revision,
        }
    }

    /// Record a successful save.
    ///
    /// The saved text becomes the new baseline. The document is only marked
    /// clean when nothing changed since the save point was taken; returns
    /// whether it is clean afterwards.
    pub fn mark_saved(&self, point: &SavePoint) -> bool {
        let clean = {
            let mut state = self.write();
            state.saved = point.content.clone();
            if state.revision == point.revision {
                state.dirty = false;
            }
            !state.dirty
        };
        self.notify();
        clean
    }

    pub fn content(&self) -> String {
        self.read().content.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.read().dirty
    }

    pub fn surface(&self) -> Surface {
        self.read().surface
    }

    pub fn is_preview(&self) -> bool {
        self.surface() == Surface::Preview
    }

    pub fn config(&self) -> EditorConfig {
        self.read().config.clone()
    }

    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> EditorSnapshot {
        let state = self.read();
        EditorSnapshot {
            content: state.content.clone(),
            revision: state.revision,
            dirty: state.dirty,
            surface: state.surface,
            config: state.config.clone(),
        }
    }

    /// Receive a notification after every state change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_content_marks_dirty() {
        let store = EditorStore::default();
        store.update_content("Abstract");

        assert_eq!(store.content(), "Abstract");
        assert!(store.is_dirty());
    }

    #[test]
    fn test_update_content_is_idempotent() {
        let store = EditorStore::default();
        store.update_content("x");
        let revision = store.revision();
        let dirty = store.is_dirty();

        store.update_content("x");

        assert_eq!(store.revision(), revision);
        assert_eq!(store.is_dirty(), dirty);
    }

    #[test]
    fn test_returning_to_saved_text_is_clean() {
        let store = EditorStore::default();
        store.load("# Intro");
        store.update_content("# Intro!");
        assert!(store.is_dirty());

        store.update_content("# Intro");
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_load_is_clean() {
        let store = EditorStore::default();
        store.update_content("draft");
        store.load("from server");

        assert_eq!(store.content(), "from server");
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_toggle_preview_round_trip() {
        let store = EditorStore::default();
        store.update_content("unsaved text");
        let before = store.snapshot();

        assert_eq!(store.toggle_preview(), Surface::Preview);
        assert!(store.is_preview());
        assert_eq!(store.toggle_preview(), Surface::Edit);

        let after = store.snapshot();
        assert_eq!(after.content, before.content);
        assert_eq!(after.dirty, before.dirty);
        assert_eq!(after.revision, before.revision);
    }

    #[test]
    fn test_mark_saved_clears_dirty() {
        let store = EditorStore::default();
        store.update_content("X");
        let point = store.save_point();

        assert!(store.mark_saved(&point));
        assert!(!store.is_dirty());
        assert_eq!(store.content(), "X");
    }

    #[test]
    fn test_edit_during_save_stays_dirty() {
        let store = EditorStore::default();
        store.update_content("X");
        let point = store.save_point();
        store.update_content("XY");

        assert!(!store.mark_saved(&point));
        assert!(store.is_dirty());

        // The saved baseline moved to "X"
        store.update_content("X");
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_update_config_merges() {
        let store = EditorStore::default();
        store.update_config(&EditorConfigPatch::default().with_minimap(true));

        let config = store.config();
        assert!(config.minimap);
        assert_eq!(config.font_size, EditorConfig::default().font_size);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = EditorStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.update_content("a");
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        store.update_content("a");
        assert!(!rx.has_changed().unwrap());

        store.toggle_preview();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_handles_share_state() {
        let store = EditorStore::default();
        let other = store.clone();
        other.update_content("shared");
        assert_eq!(store.content(), "shared");

        let isolated = EditorStore::default();
        assert_eq!(isolated.content(), "");
    }
}
