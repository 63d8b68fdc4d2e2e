//! Session persistence.
//!
//! A [`SessionStore`] keeps the bearer token and the signed-in identity, mirroring every
//! change into a [`KeyValueStore`] slot so a later process sees the same session.
//! Absence of the token key means "logged out". Tokens are never logged.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "jwtToken";
pub const IDENTITY_KEY: &str = "userEmail";

/// Persistent string slots, keyed by well-known names.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-local storage, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.slots().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.slots().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.slots().remove(key);
        Ok(())
    }
}

/// JSON object on disk, written with owner-only permissions on unix.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        // An unparseable file is treated as empty so the next write replaces it.
        match serde_json::from_str(&contents) {
            Ok(slots) => Ok(slots),
            Err(err) => {
                warn!(
                    "discarding unreadable session file {}: {err}",
                    self.path.display()
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, slots: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(slots).context("failed to serialize session")?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&self.path)
            .with_context(|| format!("failed to open {} for writing", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut slots = self.load()?;
        slots.insert(key.to_string(), value.to_string());
        self.save(&slots)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut slots = self.load()?;
        if slots.remove(key).is_some() {
            self.save(&slots)?;
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// The single signed-in session, backed by a [`KeyValueStore`].
///
/// Storage failures are logged and swallowed: the in-memory view still changes so the
/// current process behaves as asked, the next process just won't see it.
pub struct SessionStore {
    storage: Box<dyn KeyValueStore>,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    /// Restores whatever session the storage already holds.
    pub fn new(storage: impl KeyValueStore + 'static) -> Self {
        let current = restore(&storage);
        debug!(authenticated = current.is_some(), "session restored");
        Self {
            storage: Box::new(storage),
            current: Mutex::new(current),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn login(&self, token: impl Into<String>, identity: impl Into<String>) {
        let session = Session {
            token: token.into(),
            identity: Some(identity.into()),
        };

        self.persist(|storage| {
            storage.set(TOKEN_KEY, &session.token)?;
            if let Some(identity) = &session.identity {
                storage.set(IDENTITY_KEY, identity)?;
            }
            Ok(())
        });
        *self.current() = Some(session);
    }

    pub fn logout(&self) {
        self.persist(|storage| {
            storage.remove(TOKEN_KEY)?;
            storage.remove(IDENTITY_KEY)
        });
        *self.current() = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn current_token(&self) -> Option<String> {
        self.current().as_ref().map(|session| session.token.clone())
    }

    pub fn identity(&self) -> Option<String> {
        self.current()
            .as_ref()
            .and_then(|session| session.identity.clone())
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, write: impl FnOnce(&dyn KeyValueStore) -> anyhow::Result<()>) {
        if let Err(err) = write(self.storage.as_ref()) {
            warn!("session storage unavailable, change kept in memory only: {err:#}");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

fn restore(storage: &dyn KeyValueStore) -> Option<Session> {
    let token = match storage.get(TOKEN_KEY) {
        Ok(token) => token?,
        Err(err) => {
            warn!("could not read stored session: {err:#}");
            return None;
        }
    };
    let identity = storage.get(IDENTITY_KEY).unwrap_or_else(|err| {
        warn!("could not read stored identity: {err:#}");
        None
    });
    Some(Session { token, identity })
}
