//! Хранилище броней и занятых мест.
//!
//! [`ReservationStore`] описывает ровно те операции, которые нужны леджеру.
//! Каждая пишущая операция атомарна: либо применяются все изменения,
//! либо ни одного. Реализации: [`PgStore`] для продакшена и
//! [`MemoryStore`] для тестов и локальных прогонов.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::future::Future;

use crate::models::{
    seat::UnknownValue, Booking, BookingId, BookingStatus, HallId, PaymentStatus, Screening,
    ScreeningId, Seat, SeatClaim, SeatId, UserId,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Бронь, которую леджер просит записать вместе с местами.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: UserId,
    pub screening_id: ScreeningId,
    pub booking_number: String,
    pub total_amount: Decimal,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub seat_ids: Vec<SeatId>,
    pub booking_date: NaiveDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Часть мест уже занята живыми бронями на этот сеанс.
    #[error("seats already claimed: {0:?}")]
    SeatsTaken(Vec<SeatId>),

    #[error("booking number {0} already exists")]
    DuplicateBookingNumber(String),

    #[error("screening {0} not found")]
    ScreeningNotFound(ScreeningId),

    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(#[from] UnknownValue),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

pub trait ReservationStore: Send + Sync + 'static {
    fn get_screening(
        &self,
        screening_id: ScreeningId,
    ) -> impl Future<Output = Result<Option<Screening>>> + Send + '_;

    /// Все места зала, включая неактивные, по порядку (ряд, номер).
    fn seats_for_hall(
        &self,
        hall_id: HallId,
    ) -> impl Future<Output = Result<Vec<Seat>>> + Send + '_;

    /// Места, на которые на этот сеанс есть живая (не освобождённая) бронь.
    fn claimed_seat_ids(
        &self,
        screening_id: ScreeningId,
    ) -> impl Future<Output = Result<Vec<SeatId>>> + Send + '_;

    fn is_seat_claimed(
        &self,
        screening_id: ScreeningId,
        seat_id: SeatId,
    ) -> impl Future<Output = Result<bool>> + Send + '_;

    /// Атомарно: перепроверяет места внутри транзакции, создаёт бронь и по
    /// одной записи `SeatClaim` на место.
    ///
    /// Ошибки `SeatsTaken` и `DuplicateBookingNumber` гарантируют, что ничего
    /// не записано.
    fn insert_booking(
        &self,
        booking: NewBooking,
    ) -> impl Future<Output = Result<Booking>> + Send + '_;

    fn get_booking(
        &self,
        booking_id: BookingId,
    ) -> impl Future<Output = Result<Option<Booking>>> + Send + '_;

    /// Записи о местах брони, в том числе уже освобождённые.
    fn claims_for_booking(
        &self,
        booking_id: BookingId,
    ) -> impl Future<Output = Result<Vec<SeatClaim>>> + Send + '_;

    /// Брони пользователя, новые первыми.
    fn bookings_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Booking>>> + Send + '_;

    /// Атомарно переводит бронь в `cancelled` и освобождает её места.
    /// Из двух конкурентных вызовов успешен ровно один, второй получает
    /// `AlreadyCancelled`.
    fn cancel_booking(
        &self,
        booking_id: BookingId,
        at: NaiveDateTime,
    ) -> impl Future<Output = Result<Booking>> + Send + '_;

    /// Помечает бронь оплаченной. Отменённые брони не трогает.
    fn mark_paid(
        &self,
        booking_id: BookingId,
        at: NaiveDateTime,
    ) -> impl Future<Output = Result<Booking>> + Send + '_;

    /// Атомарно выключает сеанс, отменяет все его брони и освобождает места.
    /// Возвращает число отменённых броней.
    fn deactivate_screening(
        &self,
        screening_id: ScreeningId,
        at: NaiveDateTime,
    ) -> impl Future<Output = Result<u64>> + Send + '_;
}
