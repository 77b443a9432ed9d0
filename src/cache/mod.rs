use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::{database::Database, redis_client::RedisClient};

pub mod programs;
pub mod speakers;

// Кеш публичных страниц. В допуске к местам не участвует:
// занятость мест всегда читается из хранилища заявок.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, ttl_seconds: u64) -> Self {
        Self { redis, db, ttl_seconds }
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        match self.get_speakers().await {
            Ok(speakers) => info!("Loaded {} speakers", speakers.len()),
            Err(e) => warn!("Speaker warmup failed: {}", e),
        }
        match self.get_programs().await {
            Ok(programs) => info!("Loaded {} program sessions", programs.len()),
            Err(e) => warn!("Program warmup failed: {}", e),
        }

        info!("Cache warmup done");
    }

    // === Работа с кешем ===
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        match data {
            Some(data) => serde_json::from_str(&data).map(Some).map_err(|_| {
                redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
            }),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(value).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(key, data, self.ttl_seconds).await
    }

    async fn invalidate(&self, keys: &[&str]) {
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.del(keys.to_vec()).await;
        if let Err(e) = result {
            // Ключ доживёт до TTL
            warn!("Cache invalidation failed for {:?}: {}", keys, e);
        }
    }
}
