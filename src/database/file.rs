use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use super::CacheStore;
use crate::error::CacheResult;
use crate::models::{CacheEntry, ProductKey, Source};

/// All cache entries in one JSON object keyed by `"<product>||<source>"`.
///
/// The whole file is rewritten on every `set`. The mutex only orders
/// read-modify-write cycles inside this process. Entries are kept as raw
/// JSON and decoded one key at a time, so an entry this version cannot read
/// neither hides nor deletes its neighbours.
pub struct FileCacheStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCacheStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn entry_key(key: &ProductKey, source: Source) -> String {
        format!("{}||{}", key.as_str(), source.as_str())
    }

    /// Missing files, and files that are not a JSON object, read as an empty cache.
    async fn read_all(&self) -> CacheResult<BTreeMap<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "Ignoring unreadable cache file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(BTreeMap::new())
            }
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, Value>) -> CacheResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &ProductKey, source: Source) -> CacheResult<CacheEntry> {
        let _guard = self.lock.lock().await;
        let entry_key = Self::entry_key(key, source);
        let Some(raw) = self.read_all().await?.remove(&entry_key) else {
            return Ok(CacheEntry::default());
        };

        match serde_json::from_value(raw) {
            Ok(entry) => Ok(entry),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", entry_key, e);
                Ok(CacheEntry::default())
            }
        }
    }

    async fn set_at(
        &self,
        key: &ProductKey,
        source: Source,
        reviews: &[String],
        fetched_at: i64,
    ) -> CacheResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        let entry = CacheEntry {
            reviews: reviews.to_vec(),
            last_scraped: fetched_at,
        };
        entries.insert(Self::entry_key(key, source), serde_json::to_value(entry)?);
        self.write_all(&entries).await
    }
}
