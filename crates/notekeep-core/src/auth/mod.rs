//! Bearer token handling: the credential type, its durable stores, and the
//! session manager built on top of them.

mod session;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::default_config_dir;
use crate::error::{Error, Result};

pub use session::{Session, SessionManager, SessionStatus};

const TOKEN_FILE_NAME: &str = "auth-token.json";

/// Opaque API credential sent as `Authorization: Token <value>`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Auth("token must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Raw credential, for handing to secure storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub(crate) fn header_value(&self) -> String {
        format!("Token {}", self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Token([REDACTED])")
    }
}

/// Durable holder of a single bearer token.
///
/// Implementations must survive process restarts (file, OS keyring, ...).
pub trait TokenStore: Send + Sync + 'static {
    fn load_token(&self) -> Result<Option<Token>>;
    fn save_token(&self, token: &Token) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

/// In-process store, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Mutex<Option<Token>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: Token) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(token))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> Result<Option<Token>> {
        let guard = self
            .inner
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_token(&self, token: &Token) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|error| Error::SecureStorage(error.to_string()))?;
        guard.take();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: Token,
}

/// JSON file store, readable only by the current user on Unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the default notekeep config directory.
    pub fn in_default_location() -> Result<Self> {
        Ok(Self::new(default_config_dir()?.join(TOKEN_FILE_NAME)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load_token(&self) -> Result<Option<Token>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let stored: StoredToken = serde_json::from_str(&raw)?;
        Ok(Some(stored.token))
    }

    fn save_token(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string(&StoredToken {
            token: token.clone(),
        })?;

        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serialized)?;
        restrict_permissions(&staging)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
