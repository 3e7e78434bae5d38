//! One open paper: its store, input debouncing and save coordination

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::runtime::Handle;
use uuid::Uuid;

use super::debounce::Debouncer;
use super::editor_config::EditorConfig;
use super::format::{self, FormatCommand};
use super::store::{EditorStore, SavePoint, Surface};
use crate::backend::{BackendError, DocumentSink};

/// Paper content as opened in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl Paper {
    /// A new paper with a fresh id
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Callback receiving document text
pub type TextHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Host callbacks observing a session
#[derive(Clone, Default)]
pub struct EditorHooks {
    on_change: Option<TextHook>,
    on_save: Option<TextHook>,
}

impl EditorHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the text of every committed content change
    pub fn on_change(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(hook));
        self
    }

    /// Called with the text about to be persisted when a save starts
    pub fn on_save(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_save = Some(Arc::new(hook));
        self
    }
}

/// Last save activity, for the toolbar
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved(SystemTime),
    Failed(String),
}

/// Content handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub paper_id: String,
    pub title: String,
    point: SavePoint,
}

impl SaveTicket {
    pub fn content(&self) -> &str {
        &self.point.content
    }
}

/// What a save accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing unsaved; no request was made
    Clean,
    Saved,
    /// Saved, but edits made while the request was in flight are still unsaved
    SavedWithNewerEdits,
}

/// Editing session for one open paper
pub struct EditorSession {
    paper_id: String,
    title: String,
    store: EditorStore,
    debouncer: Debouncer<String>,
    hooks: EditorHooks,
    status: SaveStatus,
    opened_at: Instant,
    last_save_attempt: Option<Instant>,
    last_modified: SystemTime,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("paper_id", &self.paper_id)
            .field("title", &self.title)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Open `paper` with its own store; debounce timers run on `runtime`
    pub fn open(
        runtime: Handle,
        paper: Paper,
        config: EditorConfig,
        quiescence: Duration,
        hooks: EditorHooks,
    ) -> Self {
        let store = EditorStore::new(config);
        store.load(paper.content);

        let commit_store = store.clone();
        let on_change = hooks.on_change.clone();
        let debouncer = Debouncer::new(runtime, quiescence, move |text: String| {
            tracing::debug!("Committing debounced edit ({} bytes)", text.len());
            commit_store.update_content(text.as_str());
            if let Some(ref hook) = on_change {
                hook(&text);
            }
        });

        Self {
            paper_id: paper.id,
            title: paper.title,
            store,
            debouncer,
            hooks,
            status: SaveStatus::Idle,
            opened_at: Instant::now(),
            last_save_attempt: None,
            last_modified: SystemTime::now(),
        }
    }

    pub fn paper_id(&self) -> &str {
        &self.paper_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Handle to this session's store
    pub fn store(&self) -> &EditorStore {
        &self.store
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Raw change from the edit widget; committed after the quiet period
    pub fn input(&mut self, text: String) {
        self.last_modified = SystemTime::now();
        self.debouncer.push(text);
    }

    /// Whether typed text is still waiting to reach the store
    pub fn has_pending_input(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Commit pending input immediately
    pub fn flush_input(&mut self) -> bool {
        self.debouncer.flush()
    }

    /// Apply a formatting command to the widget buffer as one edit.
    ///
    /// Bypasses the debouncer: pending input is superseded by the buffer,
    /// which already contains it, and the result is committed at once.
    /// Returns the selection to restore in the widget.
    pub fn apply_format(
        &mut self,
        buffer: &mut String,
        selection: Range<usize>,
        command: FormatCommand,
    ) -> Range<usize> {
        self.debouncer.cancel();
        let selection = format::apply(buffer, selection, command);
        self.commit(buffer.as_str());
        selection
    }

    fn commit(&mut self, text: &str) {
        self.last_modified = SystemTime::now();
        self.store.update_content(text);
        if let Some(ref hook) = self.hooks.on_change {
            hook(text);
        }
    }

    /// Switch between edit and preview without losing typed text
    pub fn toggle_preview(&mut self) -> Surface {
        self.debouncer.flush();
        self.store.toggle_preview()
    }

    /// Save is offered only while there are unsaved changes
    pub fn can_save(&self) -> bool {
        self.store.is_dirty() || self.debouncer.is_pending()
    }

    /// Start a save.
    ///
    /// Returns `None` without side effects when there is nothing to save or
    /// a save is already in flight.
    pub fn begin_save(&mut self) -> Option<SaveTicket> {
        self.debouncer.flush();
        if !self.store.is_dirty() || self.status == SaveStatus::Saving {
            return None;
        }

        let point = self.store.save_point();
        if let Some(ref hook) = self.hooks.on_save {
            hook(&point.content);
        }
        self.status = SaveStatus::Saving;
        self.last_save_attempt = Some(Instant::now());

        Some(SaveTicket {
            paper_id: self.paper_id.clone(),
            title: self.title.clone(),
            point,
        })
    }

    /// Apply the collaborator's acknowledgment for `ticket`.
    ///
    /// On failure the document stays dirty and the error is handed back.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), BackendError>,
    ) -> Result<SaveOutcome, BackendError> {
        match result {
            Ok(()) => {
                let clean = self.store.mark_saved(&ticket.point);
                self.status = SaveStatus::Saved(SystemTime::now());
                tracing::info!("Saved paper {}", self.paper_id);
                Ok(if clean {
                    SaveOutcome::Saved
                } else {
                    SaveOutcome::SavedWithNewerEdits
                })
            }
            Err(e) => {
                tracing::warn!("Failed to save paper {}: {}", self.paper_id, e);
                self.status = SaveStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Save through `sink` and apply the acknowledgment
    pub async fn save<S: DocumentSink>(&mut self, sink: &S) -> Result<SaveOutcome, BackendError> {
        let Some(ticket) = self.begin_save() else {
            return Ok(SaveOutcome::Clean);
        };
        let result = sink
            .save_document(&ticket.paper_id, &ticket.title, ticket.content())
            .await;
        self.finish_save(ticket, result)
    }

    /// Whether auto-save should fire for `interval` at `now`
    pub fn autosave_due(&self, interval: Duration, now: Instant) -> bool {
        if interval.is_zero() || self.status == SaveStatus::Saving || !self.can_save() {
            return false;
        }
        let since = self.last_save_attempt.unwrap_or(self.opened_at);
        now.saturating_duration_since(since) >= interval
    }
}
