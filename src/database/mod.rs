//! Extraction cache: `(product, source) -> (reviews, last fetch time)`.
//!
//! Stores are last-write-wins per key and carry no transactional guarantees
//! beyond that. Freshness is decided by the caller, not the store.

mod file;
mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CacheResult;
use crate::models::{CacheEntry, ProductKey, Source};

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name of the backing store, for logs.
    fn backend(&self) -> &'static str;

    /// The stored entry, or an empty entry with `last_scraped == 0`.
    async fn get(&self, key: &ProductKey, source: Source) -> CacheResult<CacheEntry>;

    /// Overwrite the entry with an explicit fetch time (unix seconds).
    async fn set_at(
        &self,
        key: &ProductKey,
        source: Source,
        reviews: &[String],
        fetched_at: i64,
    ) -> CacheResult<()>;

    /// Overwrite the entry, stamped with the current time. Empty lists are
    /// stored too.
    async fn set(&self, key: &ProductKey, source: Source, reviews: &[String]) -> CacheResult<()> {
        self.set_at(key, source, reviews, Utc::now().timestamp())
            .await
    }

    /// Release connections held by the store.
    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Opens the preferred cache store, falling back to the JSON file store when
/// the external store is not configured or cannot be reached.
pub async fn open_cache_store(config: &Config) -> Arc<dyn CacheStore> {
    if let Some(url) = &config.cache_database_url {
        match SqliteCacheStore::connect(url).await {
            Ok(store) => {
                info!("Using database cache at {}", url);
                return Arc::new(store);
            }
            Err(e) => {
                warn!(
                    "Cache database {} unavailable, falling back to file cache: {}",
                    url, e
                );
            }
        }
    }

    info!("Using file cache at {}", config.cache_file.display());
    Arc::new(FileCacheStore::new(&config.cache_file))
}
