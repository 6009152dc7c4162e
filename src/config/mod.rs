use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
    /// Применяется к каждой транзакции через `SET LOCAL statement_timeout`.
    pub statement_timeout_ms: u64,
}

// Настройки Redis. Без url кеш схем залов просто выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub seat_cache_ttl_seconds: u64,
}

// Правила бронирования
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingConfig {
    pub max_seats_per_booking: usize,
    pub cancellation_lead_minutes: i64,
    pub booking_number_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        BookingConfig {
            max_seats_per_booking: 5,
            cancellation_lead_minutes: 120,
            booking_number_attempts: 3,
        }
    }
}

impl Config {
    /// Значения по умолчанию для всего, кроме адреса БД.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let booking = BookingConfig::default();
        config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "seat_ledger=debug,tower_http=debug")?
            .set_default("database.pool_size", 20)?
            .set_default("database.acquire_timeout_seconds", 5)?
            .set_default("database.statement_timeout_ms", 5000)?
            .set_default("redis.seat_cache_ttl_seconds", 300)?
            .set_default("booking.max_seats_per_booking", booking.max_seats_per_booking as i64)?
            .set_default("booking.cancellation_lead_minutes", booking.cancellation_lead_minutes)?
            .set_default("booking.booking_number_attempts", booking.booking_number_attempts as i64)
    }

    /// Порядок: умолчания, затем `APP__SECTION__KEY`, затем привычные
    /// `DATABASE_URL`, `REDIS_URL`, `PORT`, `RUST_LOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .set_override_option("app.port", env::var("PORT").ok())?
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_everything_but_database_url() {
        let config: Config = Config::builder()
            .unwrap()
            .set_override("database.url", "postgres://localhost/cinema")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.app.port, 8000);
        assert_eq!(config.database.statement_timeout_ms, 5000);
        assert!(config.redis.url.is_none());
        assert_eq!(config.booking, BookingConfig::default());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result: Result<Config, _> = Config::builder().unwrap().build().unwrap().try_deserialize();
        assert!(result.is_err());
    }

    #[test]
    fn booking_limits_can_be_overridden() {
        let config: Config = Config::builder()
            .unwrap()
            .set_override("database.url", "postgres://localhost/cinema")
            .unwrap()
            .set_override("booking.max_seats_per_booking", 8)
            .unwrap()
            .set_override("booking.cancellation_lead_minutes", "60")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.booking.max_seats_per_booking, 8);
        assert_eq!(config.booking.cancellation_lead_minutes, 60);
        assert_eq!(config.booking.booking_number_attempts, 3);
    }
}
