use crate::cache::CacheService;
use crate::models::{HallId, Seat};
use redis::AsyncCommands;
use tracing::debug;

fn hall_seats_key(hall_id: HallId) -> String {
    format!("hall:{}:seats", hall_id)
}

impl CacheService {
    /// Схема зала из кеша. `Ok(None)`, если ключа нет или он протух.
    pub async fn get_hall_seats(&self, hall_id: HallId) -> Result<Option<Vec<Seat>>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(hall_seats_key(hall_id)).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let seats: Vec<Seat> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(Some(seats))
    }

    pub async fn save_hall_seats(&self, hall_id: HallId, seats: &[Seat]) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(seats).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex::<_, _, ()>(hall_seats_key(hall_id), data, self.seats_ttl_seconds).await?;
        debug!("Cached {} seats for hall {}", seats.len(), hall_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespaced_by_hall() {
        assert_eq!(hall_seats_key(42), "hall:42:seats");
    }
}
