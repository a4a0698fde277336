//! Bearer token storage.
//!
//! The dashboard keeps two tokens side by side: an `admin` token and a
//! `user` token. Requests prefer the admin token when both are present.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

/// Which of the two stored tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TokenKind {
    /// Admin session token.
    Admin,
    /// Customer session token.
    User,
}

impl TokenKind {
    /// Storage key of this token.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// Key/value storage for bearer tokens.
pub trait TokenStore: Send + Sync {
    /// Get a token. Empty strings count as absent.
    fn get(&self, kind: TokenKind) -> Option<String>;

    /// Store a token.
    fn set(&self, kind: TokenKind, token: &str) -> AppResult<()>;

    /// Remove a token.
    fn remove(&self, kind: TokenKind) -> AppResult<()>;
}

/// Resolve the bearer token to send: admin first, then user.
pub fn resolve_bearer(store: &dyn TokenStore) -> Option<String> {
    store
        .get(TokenKind::Admin)
        .or_else(|| store.get(TokenKind::User))
}

fn non_empty(token: Option<&String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty()).cloned()
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<BTreeMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from the `[auth]` config section.
    #[must_use]
    pub fn from_config(auth: &AuthConfig) -> Self {
        let mut tokens = BTreeMap::new();
        if let Some(token) = non_empty(auth.admin_token.as_ref()) {
            tokens.insert(TokenKind::Admin, token);
        }
        if let Some(token) = non_empty(auth.user_token.as_ref()) {
            tokens.insert(TokenKind::User, token);
        }
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        let tokens = self.tokens.read().ok()?;
        non_empty(tokens.get(&kind))
    }

    fn set(&self, kind: TokenKind, token: &str) -> AppResult<()> {
        self.tokens
            .write()
            .map_err(|e| AppError::Internal(e.to_string()))?
            .insert(kind, token.to_string());
        Ok(())
    }

    fn remove(&self, kind: TokenKind) -> AppResult<()> {
        self.tokens
            .write()
            .map_err(|e| AppError::Internal(e.to_string()))?
            .remove(&kind);
        Ok(())
    }
}

/// Token store persisted as a small JSON object on disk,
/// e.g. `{"admin": "...", "user": "..."}`.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl FileTokenStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Config(format!("invalid token file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Token file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, tokens: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(tokens)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        let cache = match self.cache.read() {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Token cache lock poisoned");
                return None;
            }
        };
        non_empty(cache.get(kind.key()))
    }

    fn set(&self, kind: TokenKind, token: &str) -> AppResult<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        cache.insert(kind.key().to_string(), token.to_string());
        self.persist(&cache)
    }

    fn remove(&self, kind: TokenKind) -> AppResult<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if cache.remove(kind.key()).is_some() {
            self.persist(&cache)?;
        }
        Ok(())
    }
}
