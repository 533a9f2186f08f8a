use anyhow::{Context, Result};
use redis::aio::ConnectionManager;

use crate::metrics::{record_cache_hit, record_cache_miss};
use crate::models::LanguagePair;

/// Read-through cache for topic listings. Content changes rarely, so a short
/// TTL is the only invalidation.
#[derive(Clone)]
pub struct TopicCache {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl TopicCache {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub fn key(pair: LanguagePair) -> String {
        format!("topics:{}:{}", pair.native, pair.active)
    }

    pub async fn get(&self, pair: LanguagePair) -> Result<Option<Vec<String>>> {
        let mut conn = self.redis.clone();
        let cached: Option<String> = redis::cmd("GET")
            .arg(Self::key(pair))
            .query_async(&mut conn)
            .await
            .context("Failed to read topic cache")?;

        match cached {
            Some(raw) => {
                record_cache_hit();
                let topics = serde_json::from_str(&raw).context("Corrupt topic cache entry")?;
                Ok(Some(topics))
            }
            None => {
                record_cache_miss();
                Ok(None)
            }
        }
    }

    pub async fn put(&self, pair: LanguagePair, topics: &[String]) -> Result<()> {
        let mut conn = self.redis.clone();
        let raw = serde_json::to_string(topics)?;
        redis::cmd("SETEX")
            .arg(Self::key(pair))
            .arg(self.ttl_secs)
            .arg(raw)
            .query_async::<()>(&mut conn)
            .await
            .context("Failed to write topic cache")?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }
}
