//! Read-through cache of the user's categories.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::models::{Category, CategoryId, NewCategory, FALLBACK_CATEGORY_COLOR};

pub trait CategoryBackend: Send + Sync + 'static {
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send;
    fn create_category(
        &self,
        category: NewCategory,
    ) -> impl Future<Output = Result<Category>> + Send;
}

#[derive(Debug, Default)]
struct CacheState {
    categories: Option<Vec<Category>>,
    epoch: u64,
}

/// Memoizes the category list until `invalidate` is called.
///
/// Created categories are inserted locally. `note_count` is whatever the
/// server reported at fetch time; call `invalidate` for fresh counts.
pub struct CategoryCache<B> {
    backend: B,
    state: Mutex<CacheState>,
}

impl<B: CategoryBackend> CategoryCache<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The cached list, fetched on first use.
    pub async fn list(&self) -> Result<Vec<Category>> {
        let epoch = {
            let state = self.lock();
            if let Some(categories) = &state.categories {
                return Ok(categories.clone());
            }
            state.epoch
        };

        let categories = self.backend.list_categories().await?;
        tracing::debug!(count = categories.len(), "Fetched categories");

        let mut state = self.lock();
        // Keep the result only if nothing invalidated the cache meanwhile.
        if state.epoch == epoch && state.categories.is_none() {
            state.categories = Some(categories.clone());
        }
        Ok(categories)
    }

    /// Validate and create a category, inserting it into the cached list.
    pub async fn create(&self, name: &str, color: &str) -> Result<CategoryId> {
        let new_category = NewCategory::new(name, color)?;
        let created = self.backend.create_category(new_category).await?;
        let id = created.id;
        tracing::info!(category_id = %id, name = %created.name, "Created category");

        let mut guard = self.lock();
        let state = &mut *guard;
        match state.categories.as_mut() {
            Some(categories) => match categories.iter_mut().find(|category| category.id == id) {
                Some(existing) => *existing = created,
                None => categories.push(created),
            },
            // A list fetch racing with this create may predate it.
            None => state.epoch = state.epoch.wrapping_add(1),
        }
        Ok(id)
    }

    /// Color for `id`, or the fallback color when it is not cached.
    pub fn color_of(&self, id: CategoryId) -> String {
        self.get(id)
            .map_or_else(|| FALLBACK_CATEGORY_COLOR.to_string(), |category| category.color)
    }

    pub fn get(&self, id: CategoryId) -> Option<Category> {
        self.lock()
            .categories
            .as_ref()
            .and_then(|categories| categories.iter().find(|category| category.id == id))
            .cloned()
    }

    /// First cached category, used for new notes.
    pub fn default_category(&self) -> Option<Category> {
        self.lock()
            .categories
            .as_ref()
            .and_then(|categories| categories.first())
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().categories.is_some()
    }

    /// Drop the cached list; the next `list` refetches.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.categories = None;
        state.epoch = state.epoch.wrapping_add(1);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
