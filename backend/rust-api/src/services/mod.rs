use std::sync::Arc;
use std::time::Duration;

use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;

use crate::config::Config;
use crate::models::exercise::validate_exercise_tables;
use crate::store::{MongoStore, Store};

pub mod error;
pub mod exclusion;
pub mod grading_service;
pub mod history_service;
pub mod selection_service;
pub mod statistics_service;
pub mod topic_cache;

pub use error::ServiceError;

use grading_service::GradingService;
use history_service::HistoryService;
use selection_service::SelectionService;
use statistics_service::StatisticsService;
use topic_cache::TopicCache;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub topic_cache: Option<TopicCache>,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: Option<redis::Client>,
    ) -> anyhow::Result<Self> {
        let mongo = MongoStore::new(mongo_client.database(&config.mongo_database));
        mongo.ensure_indexes().await?;

        let topic_cache = match redis_client {
            Some(client) => {
                tracing::info!("Attempting to connect to Redis...");
                let redis = tokio::time::timeout(
                    Duration::from_secs(30),
                    ConnectionManager::new(client),
                )
                .await
                .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;
                let cache = TopicCache::new(redis, config.topic_cache_ttl_secs);
                tokio::time::timeout(Duration::from_secs(5), cache.ping())
                    .await
                    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;
                tracing::info!("Redis topic cache enabled");
                Some(cache)
            }
            None => {
                tracing::info!("Redis not configured, topic cache disabled");
                None
            }
        };

        let mut state = Self::with_store(config, Arc::new(mongo))?;
        state.topic_cache = topic_cache;
        Ok(state)
    }

    /// Builds state around an existing store. Fails when a per-variant lookup
    /// table does not cover every variant.
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        validate_exercise_tables().map_err(anyhow::Error::msg)?;
        exclusion::validate_exclusion_table().map_err(anyhow::Error::msg)?;
        tracing::info!("Application state ready (store={})", store.backend());

        Ok(Self {
            config,
            store,
            topic_cache: None,
        })
    }

    pub fn selection(&self) -> SelectionService {
        SelectionService::new(self.store.clone(), self.topic_cache.clone())
    }

    pub fn grading(&self) -> GradingService {
        GradingService::new(self.store.clone())
    }

    pub fn statistics(&self) -> StatisticsService {
        StatisticsService::new(self.store.clone(), self.config.stats_history_limit)
    }

    pub fn history(&self) -> HistoryService {
        HistoryService::new(self.store.clone())
    }
}
