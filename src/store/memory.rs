use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{NewBooking, ReservationStore, Result, StoreError};
use crate::models::{
    Booking, BookingId, BookingStatus, HallId, PaymentStatus, Screening, ScreeningId, Seat,
    SeatClaim, SeatId, UserId,
};

#[derive(Debug, Default)]
struct State {
    screenings: HashMap<ScreeningId, Screening>,
    seats: BTreeMap<SeatId, Seat>,
    bookings: BTreeMap<BookingId, Booking>,
    claims: Vec<SeatClaim>,
    next_booking_id: BookingId,
    next_claim_id: i64,
}

impl State {
    fn live_claim(&self, screening_id: ScreeningId, seat_id: SeatId) -> bool {
        self.claims
            .iter()
            .any(|c| c.screening_id == screening_id && c.seat_id == seat_id && c.is_live())
    }
}

/// Хранилище в памяти процесса.
///
/// Все изменения одной операции применяются под одним коротким локом, так что
/// проверка мест и вставка записей не разделимы, как и в транзакции Postgres.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    /// Все следующие пишущие операции завершаются ошибкой хранилища,
    /// не меняя состояние.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn add_screening(&self, screening: Screening) -> Result<()> {
        self.lock()?.screenings.insert(screening.screening_id, screening);
        Ok(())
    }

    pub fn add_seat(&self, seat: Seat) -> Result<()> {
        self.lock()?.seats.insert(seat.seat_id, seat);
        Ok(())
    }

    pub fn set_seat_active(&self, seat_id: SeatId, active: bool) -> Result<()> {
        if let Some(seat) = self.lock()?.seats.get_mut(&seat_id) {
            seat.is_active = active;
        }
        Ok(())
    }

    pub fn booking_count(&self) -> Result<usize> {
        Ok(self.lock()?.bookings.len())
    }

    pub fn claim_count(&self) -> Result<usize> {
        Ok(self.lock()?.claims.len())
    }
}

impl ReservationStore for MemoryStore {
    async fn get_screening(&self, screening_id: ScreeningId) -> Result<Option<Screening>> {
        Ok(self.lock()?.screenings.get(&screening_id).cloned())
    }

    async fn seats_for_hall(&self, hall_id: HallId) -> Result<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .lock()?
            .seats
            .values()
            .filter(|s| s.hall_id == hall_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| (s.row_number, s.seat_number));
        Ok(seats)
    }

    async fn claimed_seat_ids(&self, screening_id: ScreeningId) -> Result<Vec<SeatId>> {
        let mut ids: Vec<SeatId> = self
            .lock()?
            .claims
            .iter()
            .filter(|c| c.screening_id == screening_id && c.is_live())
            .map(|c| c.seat_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn is_seat_claimed(&self, screening_id: ScreeningId, seat_id: SeatId) -> Result<bool> {
        Ok(self.lock()?.live_claim(screening_id, seat_id))
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking> {
        let mut state = self.lock()?;
        self.check_writable()?;

        let mut taken: Vec<SeatId> = booking
            .seat_ids
            .iter()
            .copied()
            .filter(|seat_id| state.live_claim(booking.screening_id, *seat_id))
            .collect();
        if !taken.is_empty() {
            taken.sort_unstable();
            return Err(StoreError::SeatsTaken(taken));
        }

        if state.bookings.values().any(|b| b.booking_number == booking.booking_number) {
            return Err(StoreError::DuplicateBookingNumber(booking.booking_number));
        }

        state.next_booking_id += 1;
        let booking_id = state.next_booking_id;
        let created = Booking {
            booking_id,
            user_id: booking.user_id,
            screening_id: booking.screening_id,
            booking_number: booking.booking_number,
            num_tickets: booking.seat_ids.len() as i32,
            total_amount: booking.total_amount,
            booking_status: booking.booking_status,
            payment_status: booking.payment_status,
            booking_date: booking.booking_date,
        };

        for seat_id in &booking.seat_ids {
            state.next_claim_id += 1;
            let seat_booking_id = state.next_claim_id;
            state.claims.push(SeatClaim {
                seat_booking_id,
                booking_id,
                seat_id: *seat_id,
                screening_id: booking.screening_id,
                booking_date: booking.booking_date,
                released_at: None,
            });
        }
        state.bookings.insert(booking_id, created.clone());

        Ok(created)
    }

    async fn get_booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        Ok(self.lock()?.bookings.get(&booking_id).cloned())
    }

    async fn claims_for_booking(&self, booking_id: BookingId) -> Result<Vec<SeatClaim>> {
        let mut claims: Vec<SeatClaim> = self
            .lock()?
            .claims
            .iter()
            .filter(|c| c.booking_id == booking_id)
            .cloned()
            .collect();
        claims.sort_by_key(|c| c.seat_id);
        Ok(claims)
    }

    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| {
            b.booking_date
                .cmp(&a.booking_date)
                .then(b.booking_id.cmp(&a.booking_id))
        });
        Ok(bookings)
    }

    async fn cancel_booking(&self, booking_id: BookingId, at: NaiveDateTime) -> Result<Booking> {
        let mut state = self.lock()?;
        self.check_writable()?;

        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        if booking.booking_status == BookingStatus::Cancelled {
            return Err(StoreError::AlreadyCancelled(booking_id));
        }
        booking.booking_status = BookingStatus::Cancelled;
        let cancelled = booking.clone();

        for claim in state
            .claims
            .iter_mut()
            .filter(|c| c.booking_id == booking_id && c.is_live())
        {
            claim.released_at = Some(at);
        }

        Ok(cancelled)
    }

    async fn mark_paid(&self, booking_id: BookingId, _at: NaiveDateTime) -> Result<Booking> {
        let mut state = self.lock()?;
        self.check_writable()?;

        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        if booking.booking_status == BookingStatus::Cancelled {
            return Err(StoreError::AlreadyCancelled(booking_id));
        }
        booking.payment_status = PaymentStatus::Paid;
        Ok(booking.clone())
    }

    async fn deactivate_screening(&self, screening_id: ScreeningId, at: NaiveDateTime) -> Result<u64> {
        let mut state = self.lock()?;
        self.check_writable()?;

        let screening = state
            .screenings
            .get_mut(&screening_id)
            .ok_or(StoreError::ScreeningNotFound(screening_id))?;
        screening.is_active = false;

        let mut cancelled = 0;
        for booking in state
            .bookings
            .values_mut()
            .filter(|b| b.screening_id == screening_id && !b.is_cancelled())
        {
            booking.booking_status = BookingStatus::Cancelled;
            cancelled += 1;
        }
        for claim in state
            .claims
            .iter_mut()
            .filter(|c| c.screening_id == screening_id && c.is_live())
        {
            claim.released_at = Some(at);
        }

        Ok(cancelled)
    }
}
