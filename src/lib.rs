pub mod cache;
pub mod clock;
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
use tracing::{info, warn};

use crate::services::ReservationLedger;
use crate::store::PgStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
    pub ledger: Arc<ReservationLedger<PgStore>>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        info!("Database connected");

        db.run_migrations().await?;

        // Redis необязателен: без него схемы залов читаются из БД
        let cache = match &config.redis.url {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(redis) => Some(cache::CacheService::new(redis, config.redis.seat_cache_ttl_seconds)),
                Err(e) => {
                    warn!("Redis unavailable, seat cache disabled: {:?}", e);
                    None
                }
            },
            None => None,
        };

        let store = Arc::new(PgStore::new(&db, config.database.statement_timeout_ms));
        let mut ledger = ReservationLedger::new(store, &config.booking);
        if let Some(cache) = &cache {
            ledger = ledger.with_cache(cache.clone());
        }

        Ok(Arc::new(Self {
            db,
            cache,
            config,
            ledger: Arc::new(ledger),
        }))
    }
}
