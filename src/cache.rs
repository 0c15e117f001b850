//! The local cache store.
//!
//! Every value is stored as JSON under a string key in `$TRACPRO_HOME/cache.json`. The cache is a
//! passive mirror of remote state: it is written immediately after successful remote reads and
//! writes, it is the first thing rendered at startup, and it is the fallback when a remote read
//! fails. It is never the source of truth.
//!
//! Reads never fail. A missing key, or a value that no longer deserializes into the expected type,
//! yields the default for that key.

use crate::error::Res;
use crate::model::{Categories, Document, Expense, Theme};
use crate::utils;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

pub const GOOGLE_TOKEN: &str = "tracpro_google_token";
pub const SHEET_ID: &str = "tracpro_sheet_id";
pub const SHEET_NAME: &str = "tracpro_sheet_name";
pub const LAST_PAID_BY: &str = "tracpro_last_paid_by";
pub const THEME: &str = "tracpro_theme";
pub const CACHE_EXPENSE_TYPES: &str = "tracpro_cache_expense_types";
pub const CACHE_PAYMENT_TYPES: &str = "tracpro_cache_payment_types";
pub const CACHE_USERS: &str = "tracpro_cache_users";
pub const CACHE_RECENT: &str = "tracpro_cache_recent";
pub const CACHE_TIMESTAMP: &str = "tracpro_cache_timestamp";

/// Prefix of the per-user document binding keys, e.g. `tracpro_user_sheet:someone@example.com`.
pub const USER_SHEET_PREFIX: &str = "tracpro_user_sheet:";

/// The display name used when a document id is cached without a name.
pub(crate) const UNNAMED_DOCUMENT: &str = "Expense Sheet";

/// A handle to the cache file. Clones share the same in-memory map, so a write through one handle
/// is visible through all of them.
#[derive(Debug, Clone)]
pub struct Cache {
    inner: Arc<Mutex<CacheFile>>,
}

#[derive(Debug)]
struct CacheFile {
    path: PathBuf,
    data: BTreeMap<String, Value>,
}

impl CacheFile {
    /// Writes `data` to disk and only then makes it the in-memory state, so that a failed write
    /// changes nothing.
    async fn replace(&mut self, data: BTreeMap<String, Value>) -> Res<()> {
        let json =
            serde_json::to_string_pretty(&data).context("Failed to serialize the cache to JSON")?;
        utils::write_private(&self.path, json)
            .await
            .context("Unable to save the cache")?;
        self.data = data;
        Ok(())
    }
}

impl Cache {
    /// Loads the cache from `path`. A missing file is an empty cache. A file that cannot be parsed
    /// is logged and treated as empty; it will be overwritten on the next write.
    pub async fn load(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let data = if path.is_file() {
            match utils::deserialize::<BTreeMap<String, Value>>(&path).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Ignoring unreadable cache file: {e:#}");
                    BTreeMap::new()
                }
            }
        } else {
            debug!("No cache file at {}, starting empty", path.display());
            BTreeMap::new()
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(CacheFile { path, data })),
        })
    }

    pub async fn path(&self) -> PathBuf {
        self.inner.lock().await.path.clone()
    }

    /// The raw JSON value stored at `key`.
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.data.get(key).cloned()
    }

    /// Deserializes the value stored at `key`. Returns `None` if the key is absent or if the stored
    /// value does not deserialize into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key).await?;
        match serde_json::from_value(value) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Ignoring corrupted cache value for '{key}': {e}");
                None
            }
        }
    }

    /// Like `get` but with a fallback for absent or corrupted values.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).await.unwrap_or(default)
    }

    /// Stores `value` under `key` and writes the cache file.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Res<()> {
        trace!("cache set {key}");
        let value = serde_json::to_value(value)
            .with_context(|| format!("Unable to serialize the cache value for '{key}'"))?;
        let mut file = self.inner.lock().await;
        let mut data = file.data.clone();
        data.insert(key.to_string(), value);
        file.replace(data).await
    }

    /// Removes `key` and writes the cache file.
    pub async fn remove(&self, key: &str) -> Res<()> {
        trace!("cache remove {key}");
        let mut file = self.inner.lock().await;
        if !file.data.contains_key(key) {
            return Ok(());
        }
        let mut data = file.data.clone();
        data.remove(key);
        file.replace(data).await
    }

    pub async fn token(&self) -> Option<String> {
        self.get::<String>(GOOGLE_TOKEN)
            .await
            .filter(|t| !t.is_empty())
    }

    pub async fn set_token(&self, token: &str) -> Res<()> {
        self.set(GOOGLE_TOKEN, token).await
    }

    pub async fn clear_token(&self) -> Res<()> {
        self.remove(GOOGLE_TOKEN).await
    }

    /// The bound document, if a document id is cached.
    pub async fn document(&self) -> Option<Document> {
        let id = self.get::<String>(SHEET_ID).await.filter(|s| !s.is_empty())?;
        let name = self
            .get::<String>(SHEET_NAME)
            .await
            .unwrap_or_else(|| UNNAMED_DOCUMENT.to_string());
        Some(Document::new(id, name))
    }

    pub async fn set_document(&self, document: &Document) -> Res<()> {
        self.set(SHEET_ID, &document.id).await?;
        self.set(SHEET_NAME, &document.name).await
    }

    pub async fn clear_document(&self) -> Res<()> {
        self.remove(SHEET_ID).await?;
        self.remove(SHEET_NAME).await
    }

    pub async fn last_paid_by(&self) -> Option<String> {
        self.get(LAST_PAID_BY).await
    }

    pub async fn set_last_paid_by(&self, paid_by: &str) -> Res<()> {
        self.set(LAST_PAID_BY, paid_by).await
    }

    pub async fn theme(&self) -> Theme {
        self.get_or(THEME, Theme::default()).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Res<()> {
        self.set(THEME, &theme).await
    }

    /// The cached category lists. Each list is independently keyed and defaults to empty.
    pub async fn categories(&self) -> Categories {
        Categories {
            expense_types: self.get_or(CACHE_EXPENSE_TYPES, Vec::new()).await,
            payment_types: self.get_or(CACHE_PAYMENT_TYPES, Vec::new()).await,
            users: self.get_or(CACHE_USERS, Vec::new()).await,
        }
    }

    pub async fn set_categories(&self, categories: &Categories) -> Res<()> {
        self.set(CACHE_EXPENSE_TYPES, &categories.expense_types)
            .await?;
        self.set(CACHE_PAYMENT_TYPES, &categories.payment_types)
            .await?;
        self.set(CACHE_USERS, &categories.users).await
    }

    pub async fn recent(&self) -> Vec<Expense> {
        self.get_or(CACHE_RECENT, Vec::new()).await
    }

    /// When the recent-expenses snapshot was last written.
    pub async fn recent_timestamp(&self) -> Option<DateTime<Utc>> {
        self.get(CACHE_TIMESTAMP).await
    }

    /// Replaces the recent-expenses snapshot and stamps it with the current time.
    pub async fn set_recent(&self, expenses: &[Expense]) -> Res<()> {
        self.set(CACHE_RECENT, expenses).await?;
        self.set(CACHE_TIMESTAMP, &Utc::now()).await
    }

    /// The document id that `email` was last bound to on this machine.
    pub async fn user_document(&self, email: &str) -> Option<String> {
        self.get::<String>(&user_sheet_key(email))
            .await
            .filter(|s| !s.is_empty())
    }

    pub async fn set_user_document(&self, email: &str, sheet_id: &str) -> Res<()> {
        self.set(&user_sheet_key(email), sheet_id).await
    }
}

/// The cache key of the per-user document binding for `email`.
pub fn user_sheet_key(email: &str) -> String {
    format!("{USER_SHEET_PREFIX}{}", email.trim().to_lowercase())
}

/// The default location of the cache file within `root`.
pub(crate) fn default_path(root: &Path) -> PathBuf {
    root.join("cache.json")
}
