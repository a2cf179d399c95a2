//! Cursor-following incremental list loading.
//!
//! `PaginatedListFetcher` appends pages as the host reports that the end of
//! the list is visible. Each `reset` starts a new epoch; responses that
//! belong to an earlier epoch are dropped.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{CategoryId, Page};

/// Where the next page comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub filter: Option<CategoryId>,
    /// Continuation URL from the previous page; `None` for the first page.
    pub cursor: Option<String>,
}

impl PageRequest {
    #[must_use]
    pub const fn first(filter: Option<CategoryId>) -> Self {
        Self {
            filter,
            cursor: None,
        }
    }
}

/// A cursor-paginated endpoint.
pub trait PageSource<T>: Send + Sync + 'static {
    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = Result<Page<T>>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page arrived and this many items were appended.
    Appended(usize),
    /// Another fetch is already running.
    InFlight,
    /// The server reported no further pages.
    Exhausted,
    /// A `reset` happened while this fetch was running; its result was dropped.
    Superseded,
    /// The visible index is not the last loaded item.
    NotAtEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Exhausted,
}

struct ListState<T> {
    items: Vec<T>,
    cursor: Cursor,
    loading: bool,
    epoch: u64,
    filter: Option<CategoryId>,
    cancel: CancellationToken,
}

pub struct PaginatedListFetcher<T, S> {
    source: S,
    state: Mutex<ListState<T>>,
}

impl<T, S> PaginatedListFetcher<T, S>
where
    T: Send + 'static,
    S: PageSource<T>,
{
    /// Create an empty fetcher. Nothing is requested until `reset` or
    /// `fetch_next` is called.
    pub fn new(source: S, filter: Option<CategoryId>) -> Self {
        Self {
            source,
            state: Mutex::new(ListState {
                items: Vec::new(),
                cursor: Cursor::Start,
                loading: false,
                epoch: 0,
                filter,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Drop everything loaded so far, abandon any running fetch, and load the
    /// first page for `filter`.
    pub async fn reset(&self, filter: Option<CategoryId>) -> Result<FetchOutcome> {
        {
            let mut state = self.lock();
            state.cancel.cancel();
            state.cancel = CancellationToken::new();
            state.epoch = state.epoch.wrapping_add(1);
            state.items.clear();
            state.cursor = Cursor::Start;
            state.loading = false;
            state.filter = filter;
            tracing::debug!(epoch = state.epoch, filter = ?filter, "List reset");
        }
        self.fetch_next().await
    }

    /// Load the next page, unless a fetch is running or the list is exhausted.
    ///
    /// On error the items and cursor are untouched and the call may simply be
    /// repeated.
    pub async fn fetch_next(&self) -> Result<FetchOutcome> {
        let (request, epoch, cancel) = {
            let mut state = self.lock();
            if state.loading {
                return Ok(FetchOutcome::InFlight);
            }
            let cursor = match &state.cursor {
                Cursor::Start => None,
                Cursor::Next(cursor) => Some(cursor.clone()),
                Cursor::Exhausted => return Ok(FetchOutcome::Exhausted),
            };
            state.loading = true;
            (
                PageRequest {
                    filter: state.filter,
                    cursor,
                },
                state.epoch,
                state.cancel.clone(),
            )
        };
        let _loading = LoadingGuard {
            state: &self.state,
            epoch,
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(epoch, "Page fetch cancelled by reset");
                return Ok(FetchOutcome::Superseded);
            }
            result = self.source.fetch_page(request) => result,
        };

        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::debug!(epoch, current = state.epoch, "Discarding stale page");
            return Ok(FetchOutcome::Superseded);
        }
        state.loading = false;

        match result {
            Ok(page) => {
                let appended = page.results.len();
                state.items.extend(page.results);
                state.cursor = match page.next {
                    Some(next) => Cursor::Next(next),
                    None => Cursor::Exhausted,
                };
                tracing::debug!(epoch, appended, total = state.items.len(), "Page appended");
                Ok(FetchOutcome::Appended(appended))
            }
            Err(error) => {
                tracing::warn!(epoch, "Page fetch failed: {}", error);
                Err(error)
            }
        }
    }

    /// Near-end-of-list signal: fetch more when `index` is the last loaded item.
    pub async fn notify_visible(&self, index: usize) -> Result<FetchOutcome> {
        let len = self.lock().items.len();
        if index.saturating_add(1) < len {
            return Ok(FetchOutcome::NotAtEnd);
        }
        self.fetch_next().await
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().cursor == Cursor::Exhausted
    }

    pub fn filter(&self) -> Option<CategoryId> {
        self.lock().filter
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Run `f` over the loaded items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.lock().items)
    }

    fn lock(&self) -> MutexGuard<'_, ListState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, S> PaginatedListFetcher<T, S>
where
    T: Clone + Send + 'static,
    S: PageSource<T>,
{
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }
}

/// Clears `loading` if a fetch is dropped before it completes.
struct LoadingGuard<'a, T> {
    state: &'a Mutex<ListState<T>>,
    epoch: u64,
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.epoch == self.epoch {
            state.loading = false;
        }
    }
}
