//! Persistent key-value store.
//!
//! A single JSON object on disk (`store.json` under the data directory),
//! mirrored in memory. Every `set` writes a scratch file and renames it over
//! the store. Reads and writes are refused until
//! [`KeyValueStore::initialize`] has succeeded, so a store that failed to load
//! is never overwritten.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const STORE_FILE: &str = "store.json";
/// Scratch file a write goes to before replacing the store
const STORE_TMP_FILE: &str = "store.json.tmp";

/// Key holding the first-launch flag
pub const FIRST_LAUNCH_KEY: &str = "first_launch";

pub struct KeyValueStore {
    path: PathBuf,
    tmp_path: PathBuf,
    entries: RwLock<Option<Map<String, Value>>>,
}

impl KeyValueStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORE_FILE),
            tmp_path: data_dir.join(STORE_TMP_FILE),
            entries: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_initialized(&self) -> bool {
        self.entries.read().await.is_some()
    }

    fn not_initialized(&self) -> anyhow::Error {
        anyhow!("store not initialized: {:?}", self.path)
    }

    /// Create the data directory and load existing entries.
    ///
    /// A store file that is not a JSON object is an error; it is left on disk
    /// untouched.
    pub async fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
        }

        let loaded = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str::<Map<String, Value>>(&content)
                .with_context(|| format!("Failed to parse store file: {:?}", self.path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read store file: {:?}", self.path))
            }
        };

        info!("💾 Storage initialized ({} keys)", loaded.len());
        *self.entries.write().await = Some(loaded);
        Ok(())
    }

    /// Read `key`, falling back to `default` when it is absent
    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        let guard = self.entries.read().await;
        let entries = guard.as_ref().ok_or_else(|| self.not_initialized())?;
        match entries.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .with_context(|| format!("Stored value for '{}' has an unexpected type", key)),
            None => Ok(default),
        }
    }

    /// Store `value` under `key` and persist the whole map
    pub async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to serialize value for '{}'", key))?;

        let mut guard = self.entries.write().await;
        let entries = guard.as_mut().ok_or_else(|| self.not_initialized())?;
        entries.insert(key.to_string(), value);

        let content = serde_json::to_string_pretty(&*entries)
            .context("Failed to serialize store")?;
        // Replace by rename so an interrupted write never truncates the store
        tokio::fs::write(&self.tmp_path, content)
            .await
            .with_context(|| format!("Failed to write store file: {:?}", self.tmp_path))?;
        tokio::fs::rename(&self.tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace store file: {:?}", self.path))?;

        debug!("Stored '{}' in {:?}", key, self.path);
        Ok(())
    }

    /// Whether this is the first launch; clears the flag when it is.
    pub async fn is_first_launch(&self) -> Result<bool> {
        let first = self.get(FIRST_LAUNCH_KEY, true).await?;
        if first {
            self.set(FIRST_LAUNCH_KEY, false).await?;
            info!("👋 First launch");
        }
        Ok(first)
    }
}
