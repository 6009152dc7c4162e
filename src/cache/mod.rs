use crate::redis_client::RedisClient;

pub mod seats;

/// Кеш поверх Redis. Сюда кладём только статические данные (схемы залов):
/// занятость мест всегда читается из БД.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    seats_ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, seats_ttl_seconds: u64) -> Self {
        Self { redis, seats_ttl_seconds }
    }
}
