//! ledger.rs
//!
//! Леджер броней: превращает запрос (пользователь, сеанс, набор мест) в бронь
//! с записями о местах, либо отказывает целиком без частичных изменений.
//!
//! Ключевые моменты:
//! 1.  Проверка мест и их захват выполняются хранилищем в одной транзакции;
//!     предварительному чтению схемы зала мы не доверяем.
//! 2.  Номер брони генерируется случайно, но уникальность гарантирует индекс в
//!     БД. При коллизии номер генерируется заново ограниченное число раз.
//! 3.  Отмена проходит через [`CancellationPolicy`] и освобождает места в той же
//!     транзакции, что и смена статуса.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::clock::{Clock, SystemClock};
use crate::config::BookingConfig;
use crate::error::{BookingError, Result, TakenSeat};
use crate::models::{
    Booking, BookingId, BookingStatus, PaymentStatus, Screening, ScreeningId, Seat, SeatId,
    SeatType, UserId,
};
use crate::services::{
    availability::{AvailabilityIndex, SeatAvailability},
    cancellation::CancellationPolicy,
    catalog::SeatCatalog,
    pricing,
};
use crate::store::{NewBooking, ReservationStore, StoreError};

/// Источник человекочитаемых номеров броней.
pub trait BookingNumberGenerator: Send + Sync {
    fn generate(&self, at: NaiveDateTime) -> String;
}

/// `BKG-20251018-3FA2C91B`: дата + 8 случайных hex-символов.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomBookingNumbers;

impl BookingNumberGenerator for RandomBookingNumbers {
    fn generate(&self, at: NaiveDateTime) -> String {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();
        format!("BKG-{}-{}", at.format("%Y%m%d"), suffix.to_uppercase())
    }
}

impl<F> BookingNumberGenerator for F
where
    F: Fn(NaiveDateTime) -> String + Send + Sync,
{
    fn generate(&self, at: NaiveDateTime) -> String {
        self(at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookedSeat {
    pub seat_id: SeatId,
    pub label: String,
    pub seat_type: SeatType,
    pub price: Decimal,
}

/// Бронь вместе с местами и тем, можно ли её ещё отменить.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub seats: Vec<BookedSeat>,
    pub screening_starts_at: NaiveDateTime,
    pub can_cancel: bool,
    pub cancel_reason: String,
    pub ticket_code: String,
}

pub struct ReservationLedger<S> {
    store: Arc<S>,
    availability: AvailabilityIndex<S>,
    policy: CancellationPolicy,
    max_seats_per_booking: usize,
    booking_number_attempts: u32,
    clock: Arc<dyn Clock>,
    numbers: Arc<dyn BookingNumberGenerator>,
}

impl<S: ReservationStore> ReservationLedger<S> {
    pub fn new(store: Arc<S>, config: &BookingConfig) -> Self {
        let catalog = SeatCatalog::new(store.clone(), None);
        Self {
            availability: AvailabilityIndex::new(store.clone(), catalog),
            store,
            policy: CancellationPolicy::from_minutes(config.cancellation_lead_minutes),
            max_seats_per_booking: config.max_seats_per_booking,
            booking_number_attempts: config.booking_number_attempts.max(1),
            clock: Arc::new(SystemClock),
            numbers: Arc::new(RandomBookingNumbers),
        }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        let catalog = SeatCatalog::new(self.store.clone(), Some(cache));
        self.availability = AvailabilityIndex::new(self.store.clone(), catalog);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_booking_numbers(mut self, numbers: impl BookingNumberGenerator + 'static) -> Self {
        self.numbers = Arc::new(numbers);
        self
    }

    pub fn policy(&self) -> &CancellationPolicy {
        &self.policy
    }

    pub fn availability(&self) -> &AvailabilityIndex<S> {
        &self.availability
    }

    pub fn max_seats_per_booking(&self) -> usize {
        self.max_seats_per_booking
    }

    // --- Вспомогательные функции ---

    async fn screening(&self, screening_id: ScreeningId) -> Result<Screening> {
        self.store
            .get_screening(screening_id)
            .await?
            .ok_or(BookingError::ScreeningNotFound(screening_id))
    }

    async fn active_screening(&self, screening_id: ScreeningId) -> Result<Screening> {
        let screening = self.screening(screening_id).await?;
        if !screening.is_active {
            return Err(BookingError::ScreeningNotFound(screening_id));
        }
        Ok(screening)
    }

    async fn owned_booking(&self, booking_id: BookingId, user_id: UserId) -> Result<Booking> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if booking.user_id != user_id {
            warn!("user {} tried to access booking {} of user {}", user_id, booking_id, booking.user_id);
            return Err(BookingError::Forbidden);
        }
        Ok(booking)
    }

    fn validate_seat_request(&self, seat_ids: &[SeatId]) -> Result<()> {
        if seat_ids.is_empty() {
            return Err(BookingError::InvalidRequest("select at least one seat".to_string()));
        }
        if seat_ids.len() > self.max_seats_per_booking {
            return Err(BookingError::InvalidRequest(format!(
                "at most {} seats per booking, {} requested",
                self.max_seats_per_booking,
                seat_ids.len()
            )));
        }
        let mut seen = HashSet::with_capacity(seat_ids.len());
        if let Some(dup) = seat_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(BookingError::InvalidRequest(format!("seat {} requested twice", dup)));
        }
        Ok(())
    }

    fn view(&self, booking: Booking, screening: &Screening, seats: &[Seat], now: NaiveDateTime) -> BookingView {
        let starts_at = screening.starts_at();
        let preview = self.policy.preview(&booking, starts_at, now);
        BookingView {
            seats: seats
                .iter()
                .map(|seat| BookedSeat {
                    seat_id: seat.seat_id,
                    label: seat.label(),
                    seat_type: seat.seat_type,
                    price: pricing::seat_price(screening.ticket_price, seat),
                })
                .collect(),
            screening_starts_at: starts_at,
            can_cancel: preview.can_cancel,
            cancel_reason: preview.cancel_reason,
            ticket_code: booking.ticket_code(),
            booking,
        }
    }

    async fn load_view(&self, booking: Booking, screening: &Screening, now: NaiveDateTime) -> Result<BookingView> {
        let claims = self.store.claims_for_booking(booking.booking_id).await?;
        let seat_ids: Vec<SeatId> = claims.iter().map(|c| c.seat_id).collect();
        let seats = self
            .availability
            .catalog()
            .seats_by_ids(screening.hall_id, &seat_ids)
            .await?;
        Ok(self.view(booking, screening, &seats, now))
    }

    // --- Операции ---

    /// Схема зала сеанса: каждое активное место с ценой и занятостью.
    pub async fn seat_map(&self, screening_id: ScreeningId) -> Result<Vec<SeatAvailability>> {
        let screening = self.active_screening(screening_id).await?;
        Ok(self.availability.seat_map(&screening).await?)
    }

    pub async fn available_seats(&self, screening_id: ScreeningId) -> Result<Vec<Seat>> {
        let screening = self.screening(screening_id).await?;
        Ok(self.availability.available_seats(&screening).await?)
    }

    pub async fn is_available(&self, seat_id: SeatId, screening_id: ScreeningId) -> Result<bool> {
        let screening = self.screening(screening_id).await?;
        Ok(self.availability.is_available(seat_id, &screening).await?)
    }

    /// Атомарно занимает места и создаёт подтверждённую оплаченную бронь.
    ///
    /// Ни одна ошибка не оставляет записей. Леджер сам повторяет только
    /// коллизию номера брони; остальное решает вызывающий код.
    pub async fn create_booking(
        &self,
        user_id: UserId,
        screening_id: ScreeningId,
        seat_ids: &[SeatId],
    ) -> Result<BookingView> {
        self.validate_seat_request(seat_ids)?;
        let screening = self.active_screening(screening_id).await?;

        let seats = self
            .availability
            .catalog()
            .seats_by_ids(screening.hall_id, seat_ids)
            .await?;
        let bookable: HashSet<SeatId> = seats.iter().filter(|s| s.is_active).map(|s| s.seat_id).collect();
        let unknown: Vec<SeatId> = seat_ids.iter().copied().filter(|id| !bookable.contains(id)).collect();
        if !unknown.is_empty() {
            return Err(BookingError::InvalidRequest(format!(
                "seats {:?} are not bookable in hall {}",
                unknown, screening.hall_id
            )));
        }

        let total_amount = pricing::total_price(screening.ticket_price, &seats);
        let now = self.clock.now();

        for attempt in 1..=self.booking_number_attempts {
            let request = NewBooking {
                user_id,
                screening_id,
                booking_number: self.numbers.generate(now),
                total_amount,
                booking_status: BookingStatus::Confirmed,
                payment_status: PaymentStatus::Paid,
                seat_ids: seat_ids.to_vec(),
                booking_date: now,
            };

            match self.store.insert_booking(request).await {
                Ok(booking) => {
                    info!(
                        "Booking {} created: user {}, screening {}, {} seats, total {}",
                        booking.booking_number, user_id, screening_id, booking.num_tickets, booking.total_amount
                    );
                    return Ok(self.view(booking, &screening, &seats, now));
                }
                Err(StoreError::DuplicateBookingNumber(number)) => {
                    warn!(
                        "booking number {} already taken (attempt {}/{})",
                        number, attempt, self.booking_number_attempts
                    );
                }
                Err(StoreError::SeatsTaken(taken_ids)) => {
                    let taken: Vec<TakenSeat> = seats
                        .iter()
                        .filter(|s| taken_ids.contains(&s.seat_id))
                        .map(|s| TakenSeat { seat_id: s.seat_id, label: s.label() })
                        .collect();
                    warn!(
                        "user {} lost seats {:?} on screening {}",
                        user_id,
                        taken.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
                        screening_id
                    );
                    return Err(BookingError::SeatUnavailable { seats: taken });
                }
                Err(e) => {
                    error!("create_booking failed for screening {}: {:?}", screening_id, e);
                    return Err(e.into());
                }
            }
        }

        error!(
            "no unique booking number after {} attempts for screening {}",
            self.booking_number_attempts, screening_id
        );
        Err(BookingError::Persistence(format!(
            "could not allocate a unique booking number after {} attempts",
            self.booking_number_attempts
        )))
    }

    /// Отмена брони владельцем не позже, чем за минимальный запас до сеанса.
    pub async fn cancel_booking(&self, booking_id: BookingId, user_id: UserId) -> Result<Booking> {
        let booking = self.owned_booking(booking_id, user_id).await?;
        if booking.is_cancelled() {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let screening = self.screening(booking.screening_id).await?;
        let now = self.clock.now();
        if let Err(e) = self.policy.check(screening.starts_at(), now) {
            warn!("cancellation of booking {} refused: {}", booking.booking_number, e);
            return Err(e);
        }

        let cancelled = self.store.cancel_booking(booking_id, now).await.map_err(|e| {
            if !matches!(e, StoreError::AlreadyCancelled(_)) {
                error!("cancel_booking failed for booking {}: {:?}", booking_id, e);
            }
            BookingError::from(e)
        })?;

        info!(
            "Booking {} cancelled by user {}, {} seats released",
            cancelled.booking_number, user_id, cancelled.num_tickets
        );
        Ok(cancelled)
    }

    /// Брони пользователя, новые первыми, с предварительной проверкой отмены.
    pub async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<BookingView>> {
        let bookings = self.store.bookings_for_user(user_id).await?;
        let now = self.clock.now();

        let mut screenings: HashMap<ScreeningId, Screening> = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            if !screenings.contains_key(&booking.screening_id) {
                let screening = self.screening(booking.screening_id).await?;
                screenings.insert(booking.screening_id, screening);
            }
            if let Some(screening) = screenings.get(&booking.screening_id) {
                views.push(self.load_view(booking, screening, now).await?);
            }
        }
        Ok(views)
    }

    pub async fn get_booking(&self, booking_id: BookingId, user_id: UserId) -> Result<BookingView> {
        let booking = self.owned_booking(booking_id, user_id).await?;
        let screening = self.screening(booking.screening_id).await?;
        self.load_view(booking, &screening, self.clock.now()).await
    }

    /// Отмечает оплату. Повторное подтверждение уже оплаченной брони ничего не меняет.
    pub async fn confirm_payment(&self, booking_id: BookingId, user_id: UserId) -> Result<Booking> {
        let booking = self.owned_booking(booking_id, user_id).await?;
        if booking.is_cancelled() {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }
        if booking.payment_status == PaymentStatus::Paid {
            return Ok(booking);
        }

        let paid = self.store.mark_paid(booking_id, self.clock.now()).await?;
        info!("Payment confirmed for booking {}", paid.booking_number);
        Ok(paid)
    }

    /// Выключает сеанс и отменяет все его брони, освобождая места.
    pub async fn deactivate_screening(&self, screening_id: ScreeningId) -> Result<u64> {
        let cancelled = self
            .store
            .deactivate_screening(screening_id, self.clock.now())
            .await
            .map_err(|e| {
                if !matches!(e, StoreError::ScreeningNotFound(_)) {
                    error!("deactivate_screening failed for {}: {:?}", screening_id, e);
                }
                BookingError::from(e)
            })?;

        info!("Screening {} deactivated, {} bookings cancelled", screening_id, cancelled);
        Ok(cancelled)
    }
}
