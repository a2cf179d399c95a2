//! notekeep-core - Core library for Notekeep
//!
//! Client-side sync core shared by every Notekeep front end: the token
//! session, the REST client, debounced autosave with optimistic concurrency,
//! incremental note lists, and the category cache.

pub mod api;
pub mod auth;
pub mod categories;
pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod sync;
pub mod util;

pub use api::{ApiClient, HttpTransport};
pub use auth::{Session, SessionManager, SessionStatus, Token, TokenStore};
pub use categories::CategoryCache;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{Category, CategoryId, Note, NoteId};
pub use pagination::{FetchOutcome, PaginatedListFetcher};
pub use sync::{NoteSyncEngine, SyncSettings, SyncSnapshot, SyncState};
