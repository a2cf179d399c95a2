//! Autosave for the note open in the editor.
//!
//! Edits are buffered locally and written back after a quiet period. Every
//! write carries the version the client last received from the server; a
//! stale version is reported as a conflict and never resent on its own.

mod engine;
mod retry;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Note, NoteBuffer, NoteId, NoteUpdate, NoteVersion};

pub use engine::{NoteSyncEngine, SyncSettings};
pub use retry::RetryPolicy;

/// Remote operations the sync engine needs.
pub trait NoteBackend: Send + Sync + 'static {
    fn fetch_note(&self, id: NoteId) -> impl Future<Output = Result<Note>> + Send;
    fn update_note(
        &self,
        id: NoteId,
        update: NoteUpdate,
    ) -> impl Future<Output = Result<Note>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// Local changes are waiting for the debounce timer.
    PendingSave,
    Saving,
    /// The server holds a newer version; only `reload_and_retry` continues.
    Conflict,
    /// Retries ran out or the error was not retryable. The buffer is kept.
    Failed,
}

impl SyncState {
    /// Whether a save is scheduled or running.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::PendingSave | Self::Saving)
    }
}

/// What the editor shows: buffered fields plus save status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub note_id: Option<NoteId>,
    pub state: SyncState,
    pub buffer: NoteBuffer,
    pub version: Option<NoteVersion>,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// The buffer holds edits the server has not acknowledged.
    pub dirty: bool,
}
