//! Authenticated REST client for the notes backend.

mod http;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::{SessionManager, TokenStore};
use crate::categories::CategoryBackend;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{
    Category, NewCategory, NewNote, Note, NoteId, NoteUpdate, Page, UserProfile,
};
use crate::pagination::{PageRequest, PageSource};
use crate::sync::NoteBackend;

pub use http::HttpTransport;

const NOTES_PATH: &str = "api/v1/notes/";
const CATEGORIES_PATH: &str = "api/v1/categories/";
const CURRENT_USER_PATH: &str = "api/v1/users/me/";
const CATEGORY_FILTER_PARAM: &str = "category_id";

/// Issues requests with the session's current token.
///
/// The token is read per request, so a login or logout only affects
/// requests started afterwards. Auth failures invalidate the session.
#[derive(Clone)]
pub struct ApiClient {
    transport: HttpTransport,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(transport: HttpTransport, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    /// Build the transport and session manager from `config`.
    pub fn from_config(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        let session = Arc::new(SessionManager::new(transport.clone(), store));
        Ok(Self::new(transport, session))
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub const fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        let url = self.transport.endpoint(CURRENT_USER_PATH)?;
        self.get(url).await
    }

    pub async fn fetch_note(&self, id: NoteId) -> Result<Note> {
        let url = self.note_url(id)?;
        self.get(url).await
    }

    /// PATCH the note. A stale `updated_at` yields `Error::Conflict`.
    pub async fn update_note(&self, id: NoteId, update: &NoteUpdate) -> Result<Note> {
        let url = self.note_url(id)?;
        self.send_json(Method::PATCH, url, update).await
    }

    pub async fn create_note(&self, note: NewNote) -> Result<Note> {
        let url = self.transport.endpoint(NOTES_PATH)?;
        self.send_json(Method::POST, url, &note).await
    }

    pub async fn list_notes(&self, request: &PageRequest) -> Result<Page<Note>> {
        self.fetch_page(NOTES_PATH, request).await
    }

    /// Fetch one page of a cursor-paginated endpoint.
    ///
    /// The cursor, when present, replaces `path`; the category filter is
    /// carried over if the server left it out of the continuation URL.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &PageRequest,
    ) -> Result<Page<T>> {
        let mut url = match &request.cursor {
            Some(cursor) => self.transport.resolve_cursor(cursor)?,
            None => self.transport.endpoint(path)?,
        };
        if let Some(category_id) = request.filter {
            let has_filter = url
                .query_pairs()
                .any(|(key, _)| key == CATEGORY_FILTER_PARAM);
            if !has_filter {
                url.query_pairs_mut()
                    .append_pair(CATEGORY_FILTER_PARAM, &category_id.to_string());
            }
        }
        tracing::debug!(%url, "Fetching page");
        self.get(url).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let url = self.transport.endpoint(CATEGORIES_PATH)?;
        self.get(url).await
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let url = self.transport.endpoint(CATEGORIES_PATH)?;
        self.send_json(Method::POST, url, category).await
    }

    fn note_url(&self, id: NoteId) -> Result<Url> {
        self.transport.endpoint(&format!("{NOTES_PATH}{id}/"))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.dispatch(|transport, token| transport.request(Method::GET, url, Some(token)))
            .await
    }

    async fn send_json<T, B>(&self, method: Method, url: Url, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.dispatch(|transport, token| transport.request(method, url, Some(token)).json(body))
            .await
    }

    async fn dispatch<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(&HttpTransport, &crate::auth::Token) -> RequestBuilder,
    {
        let token = self
            .session
            .current_token()
            .ok_or_else(|| Error::Auth("not signed in".to_string()))?;

        let result = self.transport.send(build(&self.transport, &token)).await;
        if let Err(error) = &result {
            if error.is_auth() {
                self.session.invalidate(&token, error);
            }
        }
        result
    }
}

impl NoteBackend for ApiClient {
    async fn fetch_note(&self, id: NoteId) -> Result<Note> {
        Self::fetch_note(self, id).await
    }

    async fn update_note(&self, id: NoteId, update: NoteUpdate) -> Result<Note> {
        Self::update_note(self, id, &update).await
    }
}

impl PageSource<Note> for ApiClient {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<Note>> {
        self.list_notes(&request).await
    }
}

impl CategoryBackend for ApiClient {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Self::list_categories(self).await
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        Self::create_category(self, &category).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::auth::{MemoryTokenStore, SessionStatus, Token};
    use crate::models::CategoryId;

    const TOKEN: &str = "api-token";

    #[derive(Clone, Default)]
    struct Backend {
        patches: Arc<Mutex<Vec<Value>>>,
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Token api-token")
    }

    fn note_json(id: i64, version: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Note {id}"),
            "content": "",
            "category": {"id": 1, "name": "Random Thoughts", "color": "#EF9C66", "note_count": 1},
            "updated_at": version,
        })
    }

    async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if authorized(&headers) {
            (
                StatusCode::OK,
                Json(json!({"id": "0b6c2a0e-3f51-4c1b-9a5d-5a1c6f1f0d11", "email": "ada@example.com"})),
            )
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})))
        }
    }

    async fn notes(
        State(backend): State<Backend>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})));
        }
        let cursor = query.get("cursor").cloned();
        backend.queries.lock().unwrap().push(query);
        match cursor.as_deref() {
            None => (
                StatusCode::OK,
                Json(json!({
                    "results": [note_json(1, "t0"), note_json(2, "t0")],
                    "next": "/api/v1/notes/?cursor=cur1",
                })),
            ),
            Some(_) => (
                StatusCode::OK,
                Json(json!({"results": [note_json(3, "t0")], "next": null})),
            ),
        }
    }

    async fn note(headers: HeaderMap, Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})));
        }
        if id == 404 {
            return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."})));
        }
        (StatusCode::OK, Json(note_json(id, "t0")))
    }

    async fn patch_note(
        State(backend): State<Backend>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(patch): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})));
        }
        backend.patches.lock().unwrap().push(patch.clone());
        if patch["updated_at"] == "t0" {
            (StatusCode::OK, Json(note_json(id, "t1")))
        } else {
            (
                StatusCode::CONFLICT,
                Json(json!({"error": "Note has been modified by another user"})),
            )
        }
    }

    async fn flaky() -> (StatusCode, Json<Value>) {
        (StatusCode::BAD_GATEWAY, Json(json!({"detail": "upstream down"})))
    }

    async fn malformed() -> Json<Value> {
        Json(json!({"items": []}))
    }

    async fn categories(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})));
        }
        (
            StatusCode::OK,
            Json(json!([{"id": 1, "name": "Random Thoughts", "color": "#EF9C66", "note_count": 2}])),
        )
    }

    async fn create_category(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        (
            StatusCode::CREATED,
            Json(json!({"id": 7, "name": body["name"], "color": body["color"], "note_count": 0})),
        )
    }

    async fn revoked() -> (StatusCode, Json<Value>) {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})))
    }

    async fn spawn_client(backend: Backend, token: Option<&str>) -> ApiClient {
        let app = Router::new()
            .route("/api/v1/users/me/", get(me))
            .route("/api/v1/notes/", get(notes))
            .route("/api/v1/notes/{id}/", get(note).patch(patch_note))
            .route("/api/v1/categories/", get(categories).post(create_category))
            .route("/revoked/", get(revoked))
            .route("/flaky/", get(flaky))
            .route("/malformed/", get(malformed))
            .with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let transport =
            HttpTransport::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let store = match token {
            Some(token) => MemoryTokenStore::with_token(Token::new(token).unwrap()),
            None => MemoryTokenStore::default(),
        };
        let session = Arc::new(SessionManager::new(transport.clone(), Arc::new(store)));
        session.restore().await.unwrap();
        ApiClient::new(transport, session)
    }

    #[tokio::test]
    async fn requests_without_session_fail_with_auth() {
        let client = spawn_client(Backend::default(), None).await;
        let error = client.fetch_note(NoteId::new(1)).await.unwrap_err();
        assert!(error.is_auth());
    }

    #[tokio::test]
    async fn unauthorized_response_invalidates_session() {
        let client = spawn_client(Backend::default(), Some(TOKEN)).await;
        assert_eq!(client.session().status(), SessionStatus::Authenticated);

        let url = client.transport().endpoint("revoked/").unwrap();
        let error = client.get::<Value>(url).await.unwrap_err();
        assert!(error.is_auth());
        assert_eq!(client.session().status(), SessionStatus::Invalid);
        assert!(client.session().current_token().is_none());

        let error = client.list_categories().await.unwrap_err();
        assert!(error.is_auth());
    }

    #[tokio::test]
    async fn patch_round_trip_and_conflict() {
        let backend = Backend::default();
        let client = spawn_client(backend.clone(), Some(TOKEN)).await;

        let note = client.fetch_note(NoteId::new(5)).await.unwrap();
        assert_eq!(note.version.as_str(), "t0");

        let update = NoteUpdate {
            title: "Hello".to_string(),
            content: String::new(),
            category_id: Some(CategoryId::new(1)),
            updated_at: note.version.clone(),
        };
        let saved = client.update_note(note.id, &update).await.unwrap();
        assert_eq!(saved.version.as_str(), "t1");

        let stale = NoteUpdate {
            updated_at: saved.version,
            ..update
        };
        let error = client.update_note(note.id, &stale).await.unwrap_err();
        assert!(error.is_conflict());

        let patches = backend.patches.lock().unwrap();
        assert_eq!(patches[0]["updated_at"], "t0");
        assert_eq!(patches[0]["category_id"], 1);
        assert_eq!(patches[1]["updated_at"], "t1");
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        let client = spawn_client(Backend::default(), Some(TOKEN)).await;

        let missing = client.fetch_note(NoteId::new(404)).await.unwrap_err();
        assert!(matches!(missing, Error::Rejected(_)));

        let url = client.transport().endpoint("flaky/").unwrap();
        let transient = client.get::<Value>(url).await.unwrap_err();
        assert!(transient.is_transient());

        let request = PageRequest::default();
        let malformed = client
            .fetch_page::<Note>("malformed/", &request)
            .await
            .unwrap_err();
        assert!(matches!(malformed, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn cursor_pages_keep_category_filter() {
        let backend = Backend::default();
        let client = spawn_client(backend.clone(), Some(TOKEN)).await;

        let first = client
            .list_notes(&PageRequest::first(Some(CategoryId::new(1))))
            .await
            .unwrap();
        assert_eq!(first.results.len(), 2);
        let next = first.next.clone().unwrap();

        let second = client
            .list_notes(&PageRequest {
                filter: Some(CategoryId::new(1)),
                cursor: Some(next),
            })
            .await
            .unwrap();
        assert!(second.is_last());

        let queries = backend.queries.lock().unwrap();
        assert_eq!(queries[0].get("category_id").map(String::as_str), Some("1"));
        assert_eq!(queries[1].get("category_id").map(String::as_str), Some("1"));
        assert_eq!(queries[1].get("cursor").map(String::as_str), Some("cur1"));
    }

    #[tokio::test]
    async fn categories_list_and_create() {
        let client = spawn_client(Backend::default(), Some(TOKEN)).await;

        let categories = client.list_categories().await.unwrap();
        assert_eq!(categories[0].note_count, 2);

        let created = client
            .create_category(&NewCategory::new("Work", "#C8CFA0").unwrap())
            .await
            .unwrap();
        assert_eq!(created.id, CategoryId::new(7));
        assert_eq!(created.name, "Work");
    }
}
