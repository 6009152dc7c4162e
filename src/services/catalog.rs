use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::cache::CacheService;
use crate::models::{HallId, Seat, SeatId};
use crate::store::{ReservationStore, Result};

/// Схемы залов. На момент бронирования только читаются.
pub struct SeatCatalog<S> {
    store: Arc<S>,
    cache: Option<CacheService>,
}

impl<S> Clone for SeatCatalog<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), cache: self.cache.clone() }
    }
}

impl<S: ReservationStore> SeatCatalog<S> {
    pub fn new(store: Arc<S>, cache: Option<CacheService>) -> Self {
        Self { store, cache }
    }

    // Все места зала, включая неактивные. Кеш необязателен: любая ошибка Redis
    // означает поход в БД.
    async fn hall_seats(&self, hall_id: HallId) -> Result<Vec<Seat>> {
        if let Some(cache) = &self.cache {
            match cache.get_hall_seats(hall_id).await {
                Ok(Some(seats)) => return Ok(seats),
                Ok(None) => {}
                Err(e) => debug!("seat cache read failed for hall {}: {:?}", hall_id, e),
            }
        }

        let seats = self.store.seats_for_hall(hall_id).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save_hall_seats(hall_id, &seats).await {
                debug!("seat cache write failed for hall {}: {:?}", hall_id, e);
            }
        }
        Ok(seats)
    }

    /// Активные места зала по порядку (ряд, номер). Для неизвестного зала список пуст.
    pub async fn list_seats(&self, hall_id: HallId) -> Result<Vec<Seat>> {
        let mut seats = self.hall_seats(hall_id).await?;
        seats.retain(|s| s.is_active);
        Ok(seats)
    }

    /// Запрошенные места зала, в том числе выключенные после бронирования.
    /// Чужие id просто отсутствуют в ответе.
    pub async fn seats_by_ids(&self, hall_id: HallId, seat_ids: &[SeatId]) -> Result<Vec<Seat>> {
        let wanted: HashSet<SeatId> = seat_ids.iter().copied().collect();
        let mut seats = self.hall_seats(hall_id).await?;
        seats.retain(|s| wanted.contains(&s.seat_id));
        Ok(seats)
    }
}
