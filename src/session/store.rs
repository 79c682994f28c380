//! Session persistence backends
//!
//! A [`SessionStore`] holds exactly two entries, the bearer token and the
//! username, so a session survives between `llmq` invocations the way a
//! browser tab keeps its session storage. Three backends are provided:
//!
//! - [`FileSessionStore`] -- JSON file in the user's data directory.
//! - [`KeyringSessionStore`] -- OS native credential store.
//! - [`MemorySessionStore`] -- process-local, used by tests and the `memory`
//!   backend.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::config::{SessionBackend, SessionConfig};
use crate::error::{LlmqError, Result};

/// Keyring service name shared by both entries.
const KEYRING_SERVICE: &str = "llmq-session";

/// The persisted pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub username: String,
}

impl StoredSession {
    /// Both entries present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.username.is_empty()
    }
}

/// Storage for the persisted session
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Read the stored session, if any.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session.
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Remove both entries. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Build the store selected by configuration
///
/// # Errors
///
/// Returns error if the `file` backend has no explicit path and the platform
/// data directory cannot be determined
pub fn build_store(config: &SessionConfig) -> Result<Box<dyn SessionStore>> {
    Ok(match config.backend {
        SessionBackend::File => match &config.path {
            Some(path) => Box::new(FileSessionStore::new(path.clone())),
            None => Box::new(FileSessionStore::in_data_dir()?),
        },
        SessionBackend::Keyring => Box::new(KeyringSessionStore),
        SessionBackend::Memory => Box::new(MemorySessionStore::new()),
    })
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// JSON file backend
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Use the given file path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Use `session.json` in the platform data directory.
    pub fn in_data_dir() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "llmq", "llmq").ok_or_else(|| {
            LlmqError::SessionStore("Could not determine data directory".to_string())
        })?;
        Ok(Self::new(proj_dirs.data_dir().join("session.json")))
    }

    /// Path of the backing file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| LlmqError::SessionStore(format!("Failed to read session file: {}", e)))?;
        let session = serde_json::from_str(&contents).map_err(LlmqError::Serialization)?;
        Ok(Some(session))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LlmqError::SessionStore(format!("Failed to create session directory: {}", e))
            })?;
        }
        let json = serde_json::to_string_pretty(session)?;
        let write_err = |e: std::io::Error| {
            LlmqError::SessionStore(format!("Failed to write session file: {}", e))
        };

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(write_err)?;

        // The creation mode does not apply to a file that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }
        file.write_all(json.as_bytes()).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LlmqError::SessionStore(format!(
                "Failed to remove session file: {}",
                e
            ))
            .into()),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyringSessionStore
// ---------------------------------------------------------------------------

/// Stateless accessor for the OS native keyring
///
/// The token and username are stored as two entries under the
/// `llmq-session` service.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringSessionStore;

impl KeyringSessionStore {
    fn entry(key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(KEYRING_SERVICE, key).map_err(LlmqError::Keyring)?)
    }

    fn read(key: &str) -> Result<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(LlmqError::Keyring(e).into()),
        }
    }

    fn delete(key: &str) -> Result<()> {
        match Self::entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(LlmqError::Keyring(e).into()),
        }
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        match (Self::read("token")?, Self::read("username")?) {
            (Some(token), Some(username)) => Ok(Some(StoredSession { token, username })),
            _ => Ok(None),
        }
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        Self::entry("token")?
            .set_password(&session.token)
            .map_err(LlmqError::Keyring)?;
        Self::entry("username")?
            .set_password(&session.username)
            .map_err(LlmqError::Keyring)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Self::delete("token")?;
        Self::delete("username")
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// In-memory backend
///
/// Clones share the same slot, so a test can keep a handle and observe what
/// the session manager persisted.
///
/// # Examples
///
/// ```
/// use llmq::session::store::{MemorySessionStore, SessionStore, StoredSession};
///
/// let store = MemorySessionStore::new();
/// let observer = store.clone();
/// store
///     .save(&StoredSession { token: "t1".into(), username: "alice".into() })
///     .unwrap();
/// assert_eq!(observer.load().unwrap().unwrap().username, "alice");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<StoredSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session.
    pub fn with_session(token: &str, username: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slot) = store.slot.lock() {
            *slot = Some(StoredSession {
                token: token.to_string(),
                username: username.to_string(),
            });
        }
        store
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<StoredSession>>> {
        self.slot
            .lock()
            .map_err(|_| LlmqError::SessionStore("session slot poisoned".to_string()).into())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}
