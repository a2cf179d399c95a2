use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{NoteBackend, RetryPolicy, SyncSnapshot, SyncState};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{Note, NoteBuffer, NoteEdit, NoteId, NoteVersion};

const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub debounce: Duration,
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub const fn from_config(config: &ClientConfig) -> Self {
        Self {
            debounce: config.save_debounce(),
            retry: RetryPolicy::from_config(config),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    /// The buffer changed; restart the debounce timer.
    Edited,
    /// Save without waiting for the timer.
    SaveNow,
    /// A different note was loaded; drop the pending timer.
    Disarm,
}

#[derive(Debug, Default)]
struct EngineState {
    note_id: Option<NoteId>,
    buffer: NoteBuffer,
    version: Option<NoteVersion>,
    last_edited_at: Option<DateTime<Utc>>,
    state: SyncState,
    last_error: Option<String>,
    /// Bumped by every `load`; work started for an older generation is dropped.
    generation: u64,
    edit_seq: u64,
    saved_seq: u64,
}

impl EngineState {
    fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            note_id: self.note_id,
            state: self.state,
            buffer: self.buffer.clone(),
            version: self.version.clone(),
            last_edited_at: self.last_edited_at,
            last_error: self.last_error.clone(),
            dirty: self.edit_seq != self.saved_seq,
        }
    }
}

/// One save cycle's inputs, captured when the cycle starts.
struct SaveJob {
    note_id: NoteId,
    generation: u64,
    buffer: NoteBuffer,
    edit_seq: u64,
}

struct Shared<B> {
    backend: B,
    settings: SyncSettings,
    state: Mutex<EngineState>,
    snapshot: watch::Sender<SyncSnapshot>,
}

impl<B> Shared<B> {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &EngineState) {
        self.snapshot.send_replace(state.snapshot());
    }
}

/// Debounced autosave for a single open note.
///
/// A worker task owns the debounce timer and runs every save, so at most one
/// update is in flight. Dropping the engine cancels the timer and any
/// running request. Must be created inside a tokio runtime.
pub struct NoteSyncEngine<B> {
    shared: Arc<Shared<B>>,
    signals: mpsc::UnboundedSender<Signal>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl<B: NoteBackend> NoteSyncEngine<B> {
    pub fn new(backend: B, settings: SyncSettings) -> Self {
        let (snapshot, _) = watch::channel(SyncSnapshot::default());
        let shared = Arc::new(Shared {
            backend,
            settings,
            state: Mutex::new(EngineState::default()),
            snapshot,
        });
        let (signals, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(shared.clone(), receiver, cancel.clone()));

        Self {
            shared,
            signals,
            cancel,
            worker: Some(worker),
        }
    }

    /// Fetch `id` from the server and make it the open note.
    ///
    /// Unsaved edits to the previous note and its pending timer are dropped.
    pub async fn load(&self, id: NoteId) -> Result<()> {
        let generation = {
            let mut state = self.shared.lock();
            state.generation = state.generation.wrapping_add(1);
            state.note_id = None;
            state.buffer = NoteBuffer::default();
            state.version = None;
            state.last_edited_at = None;
            state.state = SyncState::Idle;
            state.last_error = None;
            state.saved_seq = state.edit_seq;
            self.shared.publish(&state);
            state.generation
        };
        self.signal(Signal::Disarm);

        let fetched = self.shared.backend.fetch_note(id).await;

        let mut state = self.shared.lock();
        if state.generation != generation {
            tracing::debug!(note_id = %id, "Load superseded by a newer load");
            return Ok(());
        }
        match fetched {
            Ok(note) => {
                seed(&mut state, &note);
                tracing::debug!(note_id = %id, version = %note.version, "Loaded note");
                self.shared.publish(&state);
                Ok(())
            }
            Err(error) => {
                state.last_error = Some(error.to_string());
                self.shared.publish(&state);
                Err(error)
            }
        }
    }

    /// Apply a local edit and (re)start the debounce timer.
    ///
    /// While in `Conflict` the edit is only buffered. Edits made while a save
    /// is running are written by the next cycle.
    pub fn edit(&self, edit: NoteEdit) -> SyncState {
        let (next, rearm) = {
            let mut state = self.shared.lock();
            if state.note_id.is_none() {
                tracing::debug!("Ignoring edit with no note loaded");
                return state.state;
            }
            if !state.buffer.apply(edit) {
                return state.state;
            }
            state.edit_seq = state.edit_seq.wrapping_add(1);
            let rearm = match state.state {
                SyncState::Idle | SyncState::PendingSave | SyncState::Failed => {
                    state.state = SyncState::PendingSave;
                    true
                }
                SyncState::Saving => true,
                SyncState::Conflict => false,
            };
            self.shared.publish(&state);
            (state.state, rearm)
        };
        if rearm {
            self.signal(Signal::Edited);
        }
        next
    }

    /// Save a `Failed` buffer right away. Returns whether a save was scheduled.
    ///
    /// `Conflict` is left only through [`Self::reload_and_retry`].
    pub fn retry(&self) -> bool {
        {
            let mut state = self.shared.lock();
            if state.state != SyncState::Failed {
                return false;
            }
            state.state = SyncState::PendingSave;
            self.shared.publish(&state);
        }
        self.signal(Signal::SaveNow);
        true
    }

    /// Adopt the server's current version, keep the local buffer, and save
    /// immediately. Allowed from `Conflict` and `Failed`.
    pub async fn reload_and_retry(&self) -> Result<SyncState> {
        let (id, generation) = {
            let state = self.shared.lock();
            let Some(id) = state.note_id else {
                return Ok(state.state);
            };
            if !matches!(state.state, SyncState::Conflict | SyncState::Failed) {
                return Ok(state.state);
            }
            (id, state.generation)
        };

        let note = self.shared.backend.fetch_note(id).await?;

        {
            let mut state = self.shared.lock();
            if state.generation != generation {
                return Ok(state.state);
            }
            tracing::info!(note_id = %id, version = %note.version, "Reloaded server version after conflict");
            state.version = Some(note.version);
            state.state = SyncState::PendingSave;
            state.last_error = None;
            self.shared.publish(&state);
        }
        self.signal(Signal::SaveNow);
        Ok(SyncState::PendingSave)
    }

    /// Skip the remaining debounce delay and wait for the save to finish.
    pub async fn flush(&self) -> SyncSnapshot {
        if self.state() == SyncState::PendingSave {
            self.signal(Signal::SaveNow);
        }
        self.settled().await
    }

    /// Wait until no save is scheduled or running.
    pub async fn settled(&self) -> SyncSnapshot {
        let mut receiver = self.shared.snapshot.subscribe();
        let result = receiver.wait_for(|snapshot| !snapshot.state.is_busy()).await;
        match result {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn state(&self) -> SyncState {
        self.shared.lock().state
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Stop the worker and wait for it to exit. Pending edits are not saved.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(error) = worker.await {
                tracing::warn!("Sync worker ended abnormally: {}", error);
            }
        }
    }

    fn signal(&self, signal: Signal) {
        if self.signals.send(signal).is_err() {
            tracing::warn!(?signal, "Sync worker is gone; signal dropped");
        }
    }
}

impl<B> Drop for NoteSyncEngine<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

fn seed(state: &mut EngineState, note: &Note) {
    state.note_id = Some(note.id);
    state.buffer = NoteBuffer::from(note);
    state.version = Some(note.version.clone());
    state.last_edited_at = note.last_edited_at();
    state.state = SyncState::Idle;
    state.last_error = None;
    state.saved_seq = state.edit_seq;
}

async fn run_worker<B: NoteBackend>(
    shared: Arc<Shared<B>>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    cancel: CancellationToken,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        let save_now = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            signal = signals.recv() => match signal {
                Some(Signal::Edited) => {
                    deadline = Some(Instant::now() + shared.settings.debounce);
                    false
                }
                Some(Signal::Disarm) => {
                    deadline = None;
                    false
                }
                Some(Signal::SaveNow) => true,
                None => break,
            },
            () = timer => true,
        };

        if save_now {
            deadline = None;
            save_cycle(&shared, &cancel).await;
        }
    }

    tracing::debug!("Sync worker stopped");
}

/// Run one save with bounded retries.
async fn save_cycle<B: NoteBackend>(shared: &Shared<B>, cancel: &CancellationToken) {
    let Some(job) = begin_save(shared) else {
        return;
    };
    let policy = shared.settings.retry;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        // Re-read every attempt: the version only moves on a server response.
        let Some(version) = current_version(shared, job.generation) else {
            return;
        };
        tracing::debug!(note_id = %job.note_id, attempt, version = %version, "Saving note");

        let update = job.buffer.to_update(version);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = shared.backend.update_note(job.note_id, update) => result,
        };

        let error = match result {
            Ok(note) => {
                finish_success(shared, &job, note);
                return;
            }
            Err(error) => error,
        };

        if !policy.should_retry(attempt, &error) {
            finish_failure(shared, &job, error, attempt);
            return;
        }

        tracing::warn!(
            note_id = %job.note_id,
            attempt,
            "Transient save failure, retrying in {}ms: {}",
            policy.delay.as_millis(),
            error
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(policy.delay) => {}
        }
    }
}

fn begin_save<B>(shared: &Shared<B>) -> Option<SaveJob> {
    let mut state = shared.lock();
    let note_id = state.note_id?;
    if state.state != SyncState::PendingSave {
        return None;
    }
    state.state = SyncState::Saving;
    shared.publish(&state);
    Some(SaveJob {
        note_id,
        generation: state.generation,
        buffer: state.buffer.clone(),
        edit_seq: state.edit_seq,
    })
}

fn current_version<B>(shared: &Shared<B>, generation: u64) -> Option<NoteVersion> {
    let state = shared.lock();
    if state.generation != generation {
        return None;
    }
    state.version.clone()
}

fn finish_success<B>(shared: &Shared<B>, job: &SaveJob, note: Note) {
    let mut state = shared.lock();
    if state.generation != job.generation {
        return;
    }
    state.last_edited_at = note.last_edited_at().or_else(|| Some(Utc::now()));
    state.version = Some(note.version);
    state.saved_seq = job.edit_seq;
    state.last_error = None;
    state.state = if state.edit_seq == job.edit_seq {
        SyncState::Idle
    } else {
        SyncState::PendingSave
    };
    tracing::debug!(note_id = %job.note_id, state = ?state.state, "Note saved");
    shared.publish(&state);
}

fn finish_failure<B>(shared: &Shared<B>, job: &SaveJob, error: Error, attempts: u32) {
    let mut state = shared.lock();
    if state.generation != job.generation {
        return;
    }
    if error.is_conflict() {
        tracing::warn!(note_id = %job.note_id, "Save rejected: note was updated elsewhere");
        state.state = SyncState::Conflict;
    } else if state.edit_seq != job.edit_seq {
        // Edits made during the failed cycle start a fresh one.
        tracing::warn!(
            note_id = %job.note_id,
            attempts,
            "Save failed with newer edits pending: {}",
            error
        );
        state.state = SyncState::PendingSave;
    } else {
        tracing::error!(note_id = %job.note_id, attempts, "Failed to save note: {}", error);
        state.state = SyncState::Failed;
    }
    state.last_error = Some(error.to_string());
    shared.publish(&state);
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{CategoryId, NoteUpdate};

    struct FakeBackend {
        server: Mutex<Note>,
        revision: AtomicUsize,
        updates: Mutex<Vec<NoteUpdate>>,
        failures: Mutex<VecDeque<Error>>,
        latency: Duration,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Self::with_latency(Duration::ZERO)
        }

        fn with_latency(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                server: Mutex::new(note(1, "t0")),
                revision: AtomicUsize::new(0),
                updates: Mutex::new(Vec::new()),
                failures: Mutex::new(VecDeque::new()),
                latency,
            })
        }

        fn fail_next(&self, errors: impl IntoIterator<Item = Error>) {
            self.failures.lock().unwrap().extend(errors);
        }

        fn updates(&self) -> Vec<NoteUpdate> {
            self.updates.lock().unwrap().clone()
        }

        /// Simulate another client saving the note.
        fn touch_elsewhere(&self, version: &str) {
            self.server.lock().unwrap().version = NoteVersion::from(version);
        }
    }

    impl NoteBackend for Arc<FakeBackend> {
        async fn fetch_note(&self, id: NoteId) -> Result<Note> {
            let mut note = self.server.lock().unwrap().clone();
            note.id = id;
            Ok(note)
        }

        async fn update_note(&self, id: NoteId, update: NoteUpdate) -> Result<Note> {
            self.updates.lock().unwrap().push(update.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if let Some(error) = self.failures.lock().unwrap().pop_front() {
                return Err(error);
            }

            let mut server = self.server.lock().unwrap();
            if server.version != update.updated_at {
                return Err(Error::Conflict);
            }
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            server.id = id;
            server.title = update.title;
            server.content = update.content;
            server.version = NoteVersion::from(format!("t{revision}").as_str());
            Ok(server.clone())
        }
    }

    fn note(id: i64, version: &str) -> Note {
        Note {
            id: NoteId::new(id),
            title: "Groceries".to_string(),
            content: String::new(),
            category: None,
            created_at: None,
            version: NoteVersion::from(version),
            user_id: None,
        }
    }

    fn transient() -> Error {
        Error::Transient("503 Service Unavailable".to_string())
    }

    async fn loaded_engine(backend: &Arc<FakeBackend>) -> NoteSyncEngine<Arc<FakeBackend>> {
        let engine = NoteSyncEngine::new(backend.clone(), SyncSettings::default());
        engine.load(NoteId::new(1)).await.unwrap();
        engine
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_saves_once_with_last_values() {
        let backend = FakeBackend::new();
        let engine = loaded_engine(&backend).await;

        assert_eq!(engine.edit(NoteEdit::title("G")), SyncState::PendingSave);
        tokio::time::sleep(Duration::from_millis(400)).await;
        engine.edit(NoteEdit::title("Gr"));
        tokio::time::sleep(Duration::from_millis(400)).await;
        engine.edit(NoteEdit::content("milk"));
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(backend.updates().is_empty());

        let snapshot = engine.settled().await;
        let updates = backend.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].title, "Gr");
        assert_eq!(updates[0].content, "milk");
        assert_eq!(snapshot.state, SyncState::Idle);
        assert!(!snapshot.dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn saves_chain_the_latest_version() {
        let backend = FakeBackend::new();
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("first"));
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.version, Some(NoteVersion::from("t1")));
        assert!(snapshot.last_edited_at.is_some());

        engine.edit(NoteEdit::title("second"));
        engine.settled().await;

        let updates = backend.updates();
        assert_eq!(updates[0].updated_at.as_str(), "t0");
        assert_eq!(updates[1].updated_at.as_str(), "t1");
        assert_eq!(engine.snapshot().version, Some(NoteVersion::from("t2")));
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_is_never_resent_automatically() {
        let backend = FakeBackend::new();
        let engine = loaded_engine(&backend).await;
        backend.touch_elsewhere("t9");

        engine.edit(NoteEdit::content("local change"));
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Conflict);
        assert!(snapshot.last_error.is_some());

        assert_eq!(engine.edit(NoteEdit::title("still typing")), SyncState::Conflict);
        assert!(!engine.retry());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.updates().len(), 1);

        assert_eq!(engine.reload_and_retry().await.unwrap(), SyncState::PendingSave);
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Idle);

        let updates = backend.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].updated_at.as_str(), "t9");
        assert_eq!(updates[1].title, "still typing");
        assert_eq!(updates[1].content, "local change");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_within_bound_recover() {
        let backend = FakeBackend::new();
        backend.fail_next([transient(), transient()]);
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("retry me"));
        let started = Instant::now();
        let snapshot = engine.settled().await;

        assert_eq!(snapshot.state, SyncState::Idle);
        assert_eq!(snapshot.version, Some(NoteVersion::from("t1")));
        let updates = backend.updates();
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|update| update.updated_at.as_str() == "t0"));
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_and_keep_buffer() {
        let backend = FakeBackend::new();
        backend.fail_next([transient(), transient(), transient(), transient()]);
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("keep me"));
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Failed);
        assert_eq!(snapshot.buffer.title, "keep me");
        assert!(snapshot.dirty);
        assert!(snapshot.last_error.unwrap().contains("503"));
        assert_eq!(backend.updates().len(), 4);

        assert!(engine.retry());
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Idle);
        assert_eq!(backend.updates().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_immediately() {
        let backend = FakeBackend::new();
        backend.fail_next([Error::field("title", "Ensure this field has no more than 255 characters.")]);
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("x".repeat(300)));
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Failed);
        assert_eq!(backend.updates().len(), 1);

        // The next edit resumes autosave.
        assert_eq!(engine.edit(NoteEdit::title("short")), SyncState::PendingSave);
        assert_eq!(engine.settled().await.state, SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn edits_during_save_are_flushed_by_next_cycle() {
        let backend = FakeBackend::with_latency(Duration::from_millis(500));
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("a"));
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(engine.state(), SyncState::Saving);
        assert_eq!(engine.edit(NoteEdit::title("ab")), SyncState::Saving);

        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Idle);
        let updates = backend.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].title, "a");
        assert_eq!(updates[1].title, "ab");
        assert_eq!(updates[1].updated_at.as_str(), "t1");
    }

    #[tokio::test(start_paused = true)]
    async fn edits_during_failing_save_start_a_new_cycle() {
        let backend = FakeBackend::with_latency(Duration::from_millis(500));
        backend.fail_next([transient(), transient(), transient(), transient()]);
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("a"));
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(engine.edit(NoteEdit::title("ab")), SyncState::Saving);

        let snapshot = engine.settled().await;
        assert_eq!(snapshot.state, SyncState::Idle);
        assert!(!snapshot.dirty);
        let titles: Vec<_> = backend
            .updates()
            .into_iter()
            .map(|update| update.title)
            .collect();
        assert_eq!(titles, vec!["a", "a", "a", "a", "ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_skips_the_debounce_delay() {
        let backend = FakeBackend::new();
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::category(CategoryId::new(4)));
        let started = Instant::now();
        let snapshot = engine.flush().await;
        assert_eq!(snapshot.state, SyncState::Idle);
        assert!(started.elapsed() < Duration::from_millis(1000));
        assert_eq!(backend.updates()[0].category_id, Some(CategoryId::new(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn load_drops_pending_timer() {
        let backend = FakeBackend::new();
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("abandoned"));
        engine.load(NoteId::new(2)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(backend.updates().is_empty());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.note_id, Some(NoteId::new(2)));
        assert_eq!(snapshot.buffer.title, "Groceries");
        assert_eq!(snapshot.state, SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_engine_cancels_timer() {
        let backend = FakeBackend::new();
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("never sent"));
        drop(engine);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(backend.updates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_in_flight_retries() {
        let backend = FakeBackend::new();
        backend.fail_next([transient(), transient(), transient()]);
        let engine = loaded_engine(&backend).await;

        engine.edit(NoteEdit::title("interrupted"));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(backend.updates().len(), 1);

        engine.shutdown().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.updates().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn edits_before_load_are_ignored() {
        let backend = FakeBackend::new();
        let engine = NoteSyncEngine::new(backend.clone(), SyncSettings::default());

        assert_eq!(engine.edit(NoteEdit::title("orphan")), SyncState::Idle);
        assert_eq!(engine.flush().await.state, SyncState::Idle);
        assert!(backend.updates().is_empty());
    }
}
