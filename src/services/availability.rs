//! Индекс доступности мест на сеанс.
//!
//! Доступно = активные места зала минус места с живой бронью на этот сеанс.
//! Освобождённые при отмене записи не учитываются. Только чтение.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{Screening, Seat, SeatId};
use crate::services::{catalog::SeatCatalog, pricing};
use crate::store::{ReservationStore, Result};

/// Строка схемы зала для выбора мест.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatAvailability {
    pub seat: Seat,
    pub label: String,
    pub price: Decimal,
    pub is_available: bool,
}

pub struct AvailabilityIndex<S> {
    store: Arc<S>,
    catalog: SeatCatalog<S>,
}

impl<S: ReservationStore> AvailabilityIndex<S> {
    pub fn new(store: Arc<S>, catalog: SeatCatalog<S>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &SeatCatalog<S> {
        &self.catalog
    }

    async fn claimed(&self, screening: &Screening) -> Result<HashSet<SeatId>> {
        let ids = self.store.claimed_seat_ids(screening.screening_id).await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn available_seats(&self, screening: &Screening) -> Result<Vec<Seat>> {
        let claimed = self.claimed(screening).await?;
        let mut seats = self.catalog.list_seats(screening.hall_id).await?;
        seats.retain(|s| !claimed.contains(&s.seat_id));
        Ok(seats)
    }

    /// Одно место: должно быть активным местом зала сеанса и не занятым.
    pub async fn is_available(&self, seat_id: SeatId, screening: &Screening) -> Result<bool> {
        let seats = self.catalog.seats_by_ids(screening.hall_id, &[seat_id]).await?;
        if !seats.iter().any(|s| s.is_active) {
            return Ok(false);
        }
        let claimed = self.store.is_seat_claimed(screening.screening_id, seat_id).await?;
        Ok(!claimed)
    }

    /// Полная схема зала с ценами и занятостью.
    pub async fn seat_map(&self, screening: &Screening) -> Result<Vec<SeatAvailability>> {
        let claimed = self.claimed(screening).await?;
        let seats = self.catalog.list_seats(screening.hall_id).await?;

        Ok(seats
            .into_iter()
            .map(|seat| SeatAvailability {
                label: seat.label(),
                price: pricing::seat_price(screening.ticket_price, &seat),
                is_available: !claimed.contains(&seat.seat_id),
                seat,
            })
            .collect())
    }
}
