//! Bearer token lookup.
//!
//! Tokens live in two tiers: a session-scoped tier checked first (the
//! running process's environment by default) and a durable tier (a
//! credentials file under `~/.qrshare`). The core only reads; writing the
//! durable tier is left to whoever issues tokens.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShareError};

pub const TOKEN_ENV_VAR: &str = "QRSHARE_TOKEN";

/// Supplies the bearer token for authenticated calls.
pub trait AuthTokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A single storage tier.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
}

/// Session-scoped tier first, durable tier second.
pub struct TwoTierTokenProvider {
    session: Box<dyn TokenStore>,
    durable: Box<dyn TokenStore>,
}

impl TwoTierTokenProvider {
    pub fn new(session: impl TokenStore + 'static, durable: impl TokenStore + 'static) -> Self {
        Self {
            session: Box::new(session),
            durable: Box::new(durable),
        }
    }

    /// Environment variable first, then the profile's credentials file.
    pub fn for_profile(profile: &str) -> Result<Self> {
        Ok(Self::new(
            EnvTokenStore::new(TOKEN_ENV_VAR),
            FileTokenStore::for_profile(profile)?,
        ))
    }
}

impl AuthTokenProvider for TwoTierTokenProvider {
    fn token(&self) -> Option<String> {
        self.session.get().or_else(|| self.durable.get())
    }
}

impl<T: AuthTokenProvider + ?Sized> AuthTokenProvider for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

fn non_blank(token: String) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Reads the token from an environment variable.
pub struct EnvTokenStore {
    var: String,
}

impl EnvTokenStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenStore for EnvTokenStore {
    fn get(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_blank)
    }
}

/// Credentials document stored on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub server: String,
    pub access_token: String,
}

/// Reads `access_token` out of a JSON credentials file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_profile(profile: &str) -> Result<Self> {
        Ok(Self::new(credentials_path(profile)?))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Full credentials document, if the file exists and parses.
    pub fn load(&self) -> Option<StoredCredentials> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(creds) => Some(creds),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable credentials file");
                None
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.load().and_then(|c| non_blank(c.access_token))
    }
}

/// Directory holding config and credentials.
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".qrshare"))
        .ok_or_else(|| ShareError::configuration("Cannot determine home directory"))
}

pub fn credentials_path(profile: &str) -> Result<PathBuf> {
    Ok(config_dir()?.join(format!("credentials.{profile}.json")))
}

/// In-process token storage, handy for embedding and tests.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.inner
            .read()
            .ok()
            .and_then(|g| g.clone())
            .and_then(non_blank)
    }
}

impl AuthTokenProvider for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_tier_wins() {
        let provider = TwoTierTokenProvider::new(
            MemoryTokenStore::with_token("session-token"),
            MemoryTokenStore::with_token("durable-token"),
        );
        assert_eq!(provider.token().as_deref(), Some("session-token"));
    }

    #[test]
    fn test_falls_back_to_durable_tier() {
        let provider = TwoTierTokenProvider::new(
            MemoryTokenStore::new(),
            MemoryTokenStore::with_token("durable-token"),
        );
        assert_eq!(provider.token().as_deref(), Some("durable-token"));
    }

    #[test]
    fn test_blank_tokens_are_absent() {
        let provider =
            TwoTierTokenProvider::new(MemoryTokenStore::with_token("  "), MemoryTokenStore::new());
        assert!(provider.token().is_none());
    }

    #[test]
    fn test_file_store_reads_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.default.json");
        fs::write(
            &path,
            r#"{"server": "http://localhost:8080", "access_token": "file-token"}"#,
        )
        .unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get().as_deref(), Some("file-token"));
        assert_eq!(store.load().unwrap().server, "http://localhost:8080");
    }

    #[test]
    fn test_file_store_missing_or_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileTokenStore::new(dir.path().join("nope.json"));
        assert!(missing.get().is_none());

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert!(FileTokenStore::new(garbage).get().is_none());
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryTokenStore::with_token("t");
        assert_eq!(store.token().as_deref(), Some("t"));
        store.clear();
        assert!(store.token().is_none());
    }
}
