use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStore;
use crate::error::CacheResult;
use crate::models::{CacheEntry, ProductKey, Source};

/// Process-local cache; entries are lost on restart.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<(ProductKey, Source), CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &ProductKey, source: Source) -> CacheResult<CacheEntry> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(key.clone(), source))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_at(
        &self,
        key: &ProductKey,
        source: Source,
        reviews: &[String],
        fetched_at: i64,
    ) -> CacheResult<()> {
        self.entries.write().await.insert(
            (key.clone(), source),
            CacheEntry {
                reviews: reviews.to_vec(),
                last_scraped: fetched_at,
            },
        );
        Ok(())
    }
}
