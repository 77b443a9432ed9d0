pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;
use tokio::task;

use services::{SeatCatalog, SeatLedger, TicketCodeGenerator};
use store::PgLedgerStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub ledger: SeatLedger,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(
            &config.database.url,
            config.database.pool_size,
            config.database.acquire_timeout_seconds,
        )
        .await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        if let Some(admin) = &config.admin {
            db.bootstrap_admin(admin).await?;
        }

        let catalog = SeatCatalog::load(&db.pool).await?;

        let tickets = TicketCodeGenerator::new(config.tickets.code_length, config.tickets.code_attempts);
        let ledger = SeatLedger::new(Arc::new(PgLedgerStore::new(db.pool.clone())), catalog, tickets);

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        tracing::info!("Redis connected");
        let cache = cache::CacheService::new(redis.clone(), db.clone(), config.redis.cache_ttl_seconds);

        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
            ledger,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
