//! On-disk token cache
//!
//! A single JSON object, shared with other tools that use the same layout:
//!
//! ```json
//! {"login_token": "…", "someone@example.com_token": "…"}
//! ```
//!
//! Every mutation rewrites the whole file while holding the cache lock, so
//! threads sharing one `TokenCache` never interleave partial writes.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Key of the cached Basic token
pub const LOGIN_TOKEN_KEY: &str = "login_token";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to access token cache {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token cache is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No home directory for the default token cache")]
    NoHomeDir,
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Bearer token key for an account
pub fn token_key(email: &str) -> String {
    format!("{}_token", email)
}

/// JSON file key-value store for auth tokens
pub struct TokenCache {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl TokenCache {
    /// `~/.ifunnypy/config.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".ifunnypy").join("config.json"))
            .ok_or(CacheError::NoHomeDir)
    }

    /// Load the cache at `path`, creating an empty one if it does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let (entries, exists) = if path.exists() {
            debug!("Loading token cache from {:?}", path);
            let content = fs::read_to_string(&path).map_err(|e| CacheError::io(&path, e))?;
            if content.trim().is_empty() {
                (Map::new(), true)
            } else {
                (serde_json::from_str(&content)?, true)
            }
        } else {
            debug!("Token cache {:?} not found, starting empty", path);
            (Map::new(), false)
        };

        let cache = Self {
            path,
            entries: Mutex::new(entries),
        };

        if !exists {
            cache.flush()?;
        }

        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Store `value` under `key` and rewrite the file
    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), Value::String(value.into()));
        self.write(&entries)
    }

    /// Remove `key`, rewriting the file if it was present
    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(key);
        if removed.is_some() {
            self.write(&entries)?;
        }
        Ok(removed.and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Rewrite the file from memory
    pub fn flush(&self) -> Result<()> {
        let entries = self.entries.lock();
        self.write(&entries)
    }

    fn write(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(entries)?;

        // write-then-rename so readers never see a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| CacheError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!("Failed to replace token cache {:?}: {}", self.path, e);
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::io(&self.path, e));
        }

        debug!("Saved {} entries to token cache", entries.len());
        Ok(())
    }
}
