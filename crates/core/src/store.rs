//! Key-value persistence for sessions, history, registry and templates.
//!
//! Values are JSON text. Reads that fail or return malformed data fall back to
//! an empty default; callers never see a parse error from [`load_or_default`].

use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

/// Root directory under the user's data dir used for stored state.
pub const DEFAULT_DATA_DIR: &str = "chipcheck";

/// Keys under which each structure is stored.
pub mod keys {
    /// Snapshot of the session in progress.
    pub const ACTIVE_SESSION: &str = "activePokerSession";
    /// Archive of completed sessions.
    pub const HISTORY: &str = "pokerSessionHistory";
    /// Lifetime player registry.
    pub const PLAYER_REGISTRY: &str = "pokerPlayerRegistry";
    /// Named session presets.
    pub const TEMPLATES: &str = "pokerSessionTemplates";
}

/// Minimal string store, modelled on browser local storage.
pub trait KeyValueStore {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Delete `key`; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Decode the JSON value under `key`, or `None` when it is absent.
pub fn load_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => {
            let value = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse stored {key}"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Like [`load_json`] but treats every failure as "no data".
pub fn load_or_default<T: DeserializeOwned + Default>(store: &impl KeyValueStore, key: &str) -> T {
    match load_json(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            warn!(key, "Discarding unreadable stored data: {err:#}");
            T::default()
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let serialised =
        serde_json::to_string(value).with_context(|| format!("failed to serialise {key}"))?;
    store.set(key, &serialised)
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }

    /// Directory holding the store files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_component(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path_for(key);

        // Write beside the target and rename so a failed write never truncates it.
        let mut file = NamedTempFile::new_in(&self.root)
            .with_context(|| format!("failed to create temp file in {}", self.root.display()))?;
        file.write_all(value.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        file.persist(&path)
            .map_err(|err| anyhow!("failed to replace {}: {}", path.display(), err.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// In-memory store with an optional byte quota, used by tests and previews.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Unbounded empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once the total stored bytes would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::default();
        store.inner.write().quota = Some(bytes);
        store
    }

    /// Change or lift the quota.
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.inner.write().quota = bytes;
    }

    /// Raw stored text, bypassing JSON decoding.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.read().entries.get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(quota) = inner.quota {
            let others: usize = inner
                .entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| existing.len() + stored.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(anyhow!(
                    "quota exceeded writing {key}: {needed} bytes > {quota}"
                ));
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.write().entries.remove(key);
        Ok(())
    }
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "store".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ledger::Ledger, registry::Registry};
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get(keys::HISTORY)?, None);
        store.set(keys::HISTORY, "[]")?;
        assert!(dir.path().join("data/pokerSessionHistory.json").exists());
        assert_eq!(store.get(keys::HISTORY)?.as_deref(), Some("[]"));

        store.set(keys::HISTORY, "[1]")?;
        assert_eq!(store.get(keys::HISTORY)?.as_deref(), Some("[1]"));

        store.remove(keys::HISTORY)?;
        store.remove(keys::HISTORY)?;
        assert_eq!(store.get(keys::HISTORY)?, None);
        Ok(())
    }

    #[test]
    fn ledger_survives_store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        let mut ledger = Ledger::new();
        ledger.add_buy_in("amit", 500.0);
        ledger.add_buy_in("Amit", 250.5);
        ledger.mark_left("amit", 1000.0);

        save_json(&store, keys::ACTIVE_SESSION, &ledger)?;
        let restored: Option<Ledger> = load_json(&store, keys::ACTIVE_SESSION)?;
        assert_eq!(restored, Some(ledger));
        Ok(())
    }

    #[test]
    fn malformed_data_falls_back_to_default() -> Result<()> {
        let store = MemoryStore::new();
        store.set(keys::PLAYER_REGISTRY, "{not json")?;

        assert!(load_json::<Registry>(&store, keys::PLAYER_REGISTRY).is_err());
        let registry: Registry = load_or_default(&store, keys::PLAYER_REGISTRY);
        assert!(registry.is_empty());
        let missing: Registry = load_or_default(&store, keys::TEMPLATES);
        assert!(missing.is_empty());
        Ok(())
    }

    #[test]
    fn quota_rejects_oversized_writes_without_touching_existing() -> Result<()> {
        let store = MemoryStore::with_quota(32);
        store.set("a", "small")?;
        let err = store.set("b", &"x".repeat(64)).expect_err("write should exceed quota");
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(store.raw("a").as_deref(), Some("small"));
        assert_eq!(store.raw("b"), None);

        store.set_quota(None);
        store.set("b", &"x".repeat(64))?;
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_component("///"), "store");
    }
}
