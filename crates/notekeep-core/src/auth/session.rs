//! Session lifecycle: resolving the stored token into a validated identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use tokio::sync::watch;

use super::{Token, TokenStore};
use crate::api::HttpTransport;
use crate::error::{Error, Result};
use crate::models::UserProfile;

const AUTH_TOKEN_PATH: &str = "api/auth-token/";
const REGISTER_PATH: &str = "api/auth/register/";
const CURRENT_USER_PATH: &str = "api/v1/users/me/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Loading,
    Authenticated,
    Invalid,
}

/// Snapshot of the session published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub identity: Option<UserProfile>,
    pub token: Option<Token>,
    /// Why the session became `Invalid`.
    pub error: Option<String>,
}

impl Session {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated)
    }
}

/// Owns the session state and is the single writer of the token.
///
/// Auth failures are absorbed into the session status; only storage and
/// configuration problems are returned as errors.
///
/// Every `restore`, `login` and `logout` starts a new generation. A lookup
/// that finishes after a newer call started is discarded.
pub struct SessionManager {
    transport: HttpTransport,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<Session>,
    generation: AtomicU64,
}

impl SessionManager {
    pub fn new(transport: HttpTransport, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            transport,
            store,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Current token, if the session is authenticated. Never blocks on I/O.
    pub fn current_token(&self) -> Option<Token> {
        self.state.borrow().token.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Resolve the stored token, if any, into an authenticated session.
    ///
    /// A session that is already authenticated is left alone. Transient
    /// failures keep the stored token so a later `restore` can succeed.
    pub async fn restore(&self) -> Result<SessionStatus> {
        if self.status() == SessionStatus::Authenticated {
            return Ok(SessionStatus::Authenticated);
        }

        let generation = self.begin();
        let Some(token) = self.store.load_token()? else {
            self.state.send_replace(Session::default());
            return Ok(SessionStatus::Unauthenticated);
        };

        self.mark_loading();
        self.resolve(token, generation).await
    }

    /// Persist `token` and resolve it into an identity.
    pub async fn login(&self, token: Token) -> Result<SessionStatus> {
        self.store.save_token(&token)?;
        let generation = self.begin();
        self.mark_loading();
        self.resolve(token, generation).await
    }

    /// Re-fetch the identity for the current token.
    ///
    /// A rejected token invalidates the session. Other failures leave the
    /// session as it was and are returned to the caller.
    pub async fn refresh(&self) -> Result<SessionStatus> {
        let generation = self.generation.load(Ordering::SeqCst);
        let Some(token) = self.current_token() else {
            return Ok(self.status());
        };

        match self.fetch_identity(&token).await {
            Ok(identity) => {
                let session = Session {
                    status: SessionStatus::Authenticated,
                    identity: Some(identity),
                    token: Some(token.clone()),
                    error: None,
                };
                // A logout or login in between wins, and so does a rejection
                // of this token by another request.
                self.state.send_if_modified(|current| {
                    if !self.is_current(generation) || current.token.as_ref() != Some(&token) {
                        return false;
                    }
                    *current = session;
                    true
                });
                Ok(self.status())
            }
            Err(error) if error.is_auth() => {
                self.invalidate(&token, &error);
                Ok(self.status())
            }
            Err(error) => {
                tracing::warn!("Could not refresh session: {}", error);
                Err(error)
            }
        }
    }

    /// Exchange credentials for a token, then log in with it.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SessionStatus> {
        validate_credentials("username", username, password)?;

        let payload = serde_json::json!({
            "username": username.trim(),
            "password": password,
        });
        let request = self
            .transport
            .request(Method::POST, self.transport.endpoint(AUTH_TOKEN_PATH)?, None)
            .json(&payload);
        let response: AuthTokenResponse = self.transport.send(request).await?;
        self.login(Token::new(response.token)?).await
    }

    /// Create an account and log in with the token it comes with.
    ///
    /// Field problems reported by the server surface as `Error::Validation`.
    pub async fn register(&self, email: &str, password: &str) -> Result<SessionStatus> {
        validate_credentials("email", email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self
            .transport
            .request(Method::POST, self.transport.endpoint(REGISTER_PATH)?, None)
            .json(&payload);
        let response: RegisterResponse = self.transport.send(request).await?;
        self.login(Token::new(response.user.auth_token)?).await
    }

    /// Forget the token and reset to `Unauthenticated`. Idempotent.
    pub fn logout(&self) -> Result<()> {
        self.begin();
        self.state.send_replace(Session::default());
        self.store.clear_token()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Called when a request made with `token` was rejected as unauthorized.
    ///
    /// Ignored when the session has since moved on to a different token.
    pub fn invalidate(&self, token: &Token, reason: &Error) {
        let changed = self.state.send_if_modified(|session| {
            if session.token.as_ref() != Some(token) {
                return false;
            }
            *session = Session {
                status: SessionStatus::Invalid,
                identity: None,
                token: None,
                error: Some(reason.to_string()),
            };
            true
        });

        if changed {
            tracing::warn!("Session invalidated by the server: {}", reason);
            if let Err(error) = self.clear_stored_token(token) {
                tracing::error!("Failed to clear rejected token: {}", error);
            }
        }
    }

    fn mark_loading(&self) {
        self.state.send_modify(|session| {
            session.status = SessionStatus::Loading;
            session.error = None;
        });
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Publish `session` unless a newer call has started since `generation`.
    fn apply(&self, generation: u64, session: Session) -> bool {
        self.state.send_if_modified(|current| {
            if !self.is_current(generation) {
                return false;
            }
            *current = session;
            true
        })
    }

    /// Clear the store only while it still holds `token`.
    fn clear_stored_token(&self, token: &Token) -> Result<()> {
        if self.store.load_token()?.as_ref() == Some(token) {
            self.store.clear_token()?;
        }
        Ok(())
    }

    async fn resolve(&self, token: Token, generation: u64) -> Result<SessionStatus> {
        let result = self.fetch_identity(&token).await;
        if !self.is_current(generation) {
            tracing::debug!("Discarding identity lookup from a superseded session");
            return Ok(self.status());
        }

        match result {
            Ok(identity) => {
                tracing::debug!(user_id = %identity.id, "Session authenticated");
                let applied = self.apply(
                    generation,
                    Session {
                        status: SessionStatus::Authenticated,
                        identity: Some(identity),
                        token: Some(token),
                        error: None,
                    },
                );
                Ok(if applied {
                    SessionStatus::Authenticated
                } else {
                    self.status()
                })
            }
            Err(error) => {
                if error.is_auth() {
                    tracing::warn!("Stored token was rejected: {}", error);
                    self.clear_stored_token(&token)?;
                } else {
                    tracing::warn!("Could not verify session, keeping stored token: {}", error);
                }
                let applied = self.apply(
                    generation,
                    Session {
                        status: SessionStatus::Invalid,
                        identity: None,
                        token: None,
                        error: Some(error.to_string()),
                    },
                );
                Ok(if applied {
                    SessionStatus::Invalid
                } else {
                    self.status()
                })
            }
        }
    }

    async fn fetch_identity(&self, token: &Token) -> Result<UserProfile> {
        let request = self.transport.request(
            Method::GET,
            self.transport.endpoint(CURRENT_USER_PATH)?,
            Some(token),
        );
        let payload: serde_json::Value = self.transport.send(request).await?;
        parse_identity(payload)
    }
}

/// A `{"detail": ...}` body without an id means the token was not accepted,
/// even when it came back with a 2xx status.
fn parse_identity(payload: serde_json::Value) -> Result<UserProfile> {
    if payload.get("id").is_none() {
        if let Some(detail) = payload.get("detail").and_then(serde_json::Value::as_str) {
            return Err(Error::Auth(detail.to_string()));
        }
    }
    serde_json::from_value(payload)
        .map_err(|error| Error::MalformedResponse(format!("invalid user profile: {error}")))
}

fn validate_credentials(identifier_field: &str, identifier: &str, password: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(Error::field(identifier_field, "This field may not be blank."));
    }
    if password.is_empty() {
        return Err(Error::field("password", "This field may not be blank."));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AuthTokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user: RegisteredUser,
}

#[derive(Debug, Deserialize)]
struct RegisteredUser {
    auth_token: String,
}
