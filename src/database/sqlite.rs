use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::info;

use super::CacheStore;
use crate::error::{CacheError, CacheResult};
use crate::models::{CacheEntry, ProductKey, Source};

/// Cache entries in a SQLite database, one row per `(product_key, source)`.
#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub async fn connect(db_url: &str) -> CacheResult<Self> {
        if !db_url.starts_with("sqlite:") {
            return Err(CacheError::UnsupportedUrl(db_url.to_string()));
        }

        // Create database file if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating cache database {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;

        info!("Running cache database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &ProductKey, source: Source) -> CacheResult<CacheEntry> {
        let row = sqlx::query(
            r"
            SELECT reviews, last_scraped FROM review_cache
            WHERE product_key = ? AND source = ?
            ",
        )
        .bind(key.as_str())
        .bind(source.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(CacheEntry::default());
        };

        let reviews: String = row.get("reviews");
        Ok(CacheEntry {
            reviews: serde_json::from_str(&reviews)?,
            last_scraped: row.get("last_scraped"),
        })
    }

    async fn set_at(
        &self,
        key: &ProductKey,
        source: Source,
        reviews: &[String],
        fetched_at: i64,
    ) -> CacheResult<()> {
        sqlx::query(
            r"
            INSERT INTO review_cache (product_key, source, reviews, last_scraped)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (product_key, source)
            DO UPDATE SET reviews = excluded.reviews, last_scraped = excluded.last_scraped
            ",
        )
        .bind(key.as_str())
        .bind(source.as_str())
        .bind(serde_json::to_string(reviews)?)
        .bind(fetched_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &tempfile::TempDir) -> SqliteCacheStore {
        let url = format!("sqlite:{}", dir.path().join("cache.db").display());
        SqliteCacheStore::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn missing_entry_is_empty_and_unstamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let entry = store.get(&ProductKey::new("x"), Source::Amazon).await.unwrap();

        assert_eq!(entry, CacheEntry::default());
    }

    #[tokio::test]
    async fn set_overwrites_including_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        let key = ProductKey::new("Poco X3");

        store
            .set_at(&key, Source::Flipkart, &["nice".to_string()], 100)
            .await
            .unwrap();
        store.set_at(&key, Source::Flipkart, &[], 200).await.unwrap();

        let entry = store.get(&key, Source::Flipkart).await.unwrap();
        assert!(entry.reviews.is_empty());
        assert_eq!(entry.last_scraped, 200);
        assert!(!store.get(&key, Source::Amazon).await.unwrap().exists());
    }

    #[tokio::test]
    async fn rejects_non_sqlite_urls() {
        let err = SqliteCacheStore::connect("mongodb://localhost/reviews")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CacheError::UnsupportedUrl(_)));
    }
}
