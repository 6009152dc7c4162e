use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use super::{NewBooking, ReservationStore, Result, StoreError};
use crate::database::Database;
use crate::models::{
    booking::BookingRow, seat::SeatRow, Booking, BookingId, HallId, Screening, ScreeningId, Seat,
    SeatClaim, SeatId, UserId,
};

// Имена уникальных индексов из миграции 0001
const BOOKING_NUMBER_KEY: &str = "bookings_booking_number_key";
const LIVE_CLAIM_KEY: &str = "seat_bookings_live_claim_idx";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    statement_timeout_ms: u64,
}

impl PgStore {
    pub fn new(db: &Database, statement_timeout_ms: u64) -> Self {
        Self { pool: db.pool.clone(), statement_timeout_ms }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Каждая пишущая операция идёт в своей транзакции с ограничением по времени,
    // чтобы зависший запрос превращался в ошибку, а не держал блокировки.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(self.statement_timeout_ms.to_string())
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn taken_among(&self, screening_id: ScreeningId, seat_ids: &[SeatId]) -> Result<Vec<SeatId>> {
        let taken = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT seat_id
            FROM seat_bookings
            WHERE screening_id = $1 AND seat_id = ANY($2) AND released_at IS NULL
            ORDER BY seat_id
            "#,
        )
        .bind(screening_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn booking_exists(&self, booking_id: BookingId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE booking_id = $1)",
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

impl ReservationStore for PgStore {
    async fn get_screening(&self, screening_id: ScreeningId) -> Result<Option<Screening>> {
        let screening = sqlx::query_as::<_, Screening>(
            r#"
            SELECT screening_id, movie_id, cinema_id, hall_id, screening_date,
                   start_time, end_time, ticket_price, is_active
            FROM screenings
            WHERE screening_id = $1
            "#,
        )
        .bind(screening_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(screening)
    }

    async fn seats_for_hall(&self, hall_id: HallId) -> Result<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            r#"
            SELECT seat_id, hall_id, row_number, seat_number, seat_type, price_multiplier, is_active
            FROM seats
            WHERE hall_id = $1
            ORDER BY row_number, seat_number
            "#,
        )
        .bind(hall_id)
        .fetch_all(&self.pool)
        .await?;

        let seats = rows
            .into_iter()
            .map(Seat::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(seats)
    }

    async fn claimed_seat_ids(&self, screening_id: ScreeningId) -> Result<Vec<SeatId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT seat_id
            FROM seat_bookings
            WHERE screening_id = $1 AND released_at IS NULL
            ORDER BY seat_id
            "#,
        )
        .bind(screening_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn is_seat_claimed(&self, screening_id: ScreeningId, seat_id: SeatId) -> Result<bool> {
        let claimed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
              SELECT 1 FROM seat_bookings
              WHERE screening_id = $1 AND seat_id = $2 AND released_at IS NULL
            )
            "#,
        )
        .bind(screening_id)
        .bind(seat_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(claimed)
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking> {
        let mut tx = self.begin().await?;

        // 1) Перепроверяем места уже внутри транзакции
        let taken = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT seat_id
            FROM seat_bookings
            WHERE screening_id = $1 AND seat_id = ANY($2) AND released_at IS NULL
            ORDER BY seat_id
            "#,
        )
        .bind(booking.screening_id)
        .bind(&booking.seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        if !taken.is_empty() {
            let _ = tx.rollback().await;
            return Err(StoreError::SeatsTaken(taken));
        }

        // 2) Сама бронь
        let inserted = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (user_id, screening_id, booking_number, num_tickets, total_amount,
                                  booking_status, payment_status, booking_date, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING booking_id, user_id, screening_id, booking_number, num_tickets, total_amount,
                      booking_status, payment_status, booking_date
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.screening_id)
        .bind(&booking.booking_number)
        .bind(booking.seat_ids.len() as i32)
        .bind(booking.total_amount)
        .bind(booking.booking_status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_date)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if violates(&e, BOOKING_NUMBER_KEY) => {
                let _ = tx.rollback().await;
                return Err(StoreError::DuplicateBookingNumber(booking.booking_number));
            }
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e.into());
            }
        };

        // 3) По записи на каждое место. Уникальный индекс по живым записям
        //    ловит гонку, проскочившую мимо проверки в п.1. Места вставляем по
        //    возрастанию id, чтобы пересекающиеся брони не ловили deadlock.
        let mut ordered = booking.seat_ids.clone();
        ordered.sort_unstable();
        let claimed = sqlx::query(
            r#"
            INSERT INTO seat_bookings (booking_id, seat_id, screening_id, booking_date)
            SELECT $1, seat_id, $3, $4
            FROM UNNEST($2::BIGINT[]) AS requested(seat_id)
            ORDER BY seat_id
            "#,
        )
        .bind(row.booking_id)
        .bind(&ordered)
        .bind(booking.screening_id)
        .bind(booking.booking_date)
        .execute(&mut *tx)
        .await;

        if let Err(e) = claimed {
            let _ = tx.rollback().await;
            if violates(&e, LIVE_CLAIM_KEY) {
                let mut taken = self.taken_among(booking.screening_id, &booking.seat_ids).await?;
                if taken.is_empty() {
                    // Конкурент уже откатился, но в момент вставки место было занято
                    taken = booking.seat_ids.clone();
                }
                debug!("seat claim race lost on screening {}: {:?}", booking.screening_id, taken);
                return Err(StoreError::SeatsTaken(taken));
            }
            return Err(e.into());
        }

        tx.commit().await?;
        Ok(Booking::try_from(row)?)
    }

    async fn get_booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT booking_id, user_id, screening_id, booking_number, num_tickets, total_amount,
                   booking_status, payment_status, booking_date
            FROM bookings
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn claims_for_booking(&self, booking_id: BookingId) -> Result<Vec<SeatClaim>> {
        let claims = sqlx::query_as::<_, SeatClaim>(
            r#"
            SELECT seat_booking_id, booking_id, seat_id, screening_id, booking_date, released_at
            FROM seat_bookings
            WHERE booking_id = $1
            ORDER BY seat_id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(claims)
    }

    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT booking_id, user_id, screening_id, booking_number, num_tickets, total_amount,
                   booking_status, payment_status, booking_date
            FROM bookings
            WHERE user_id = $1
            ORDER BY booking_date DESC, booking_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let bookings = rows
            .into_iter()
            .map(Booking::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    async fn cancel_booking(&self, booking_id: BookingId, at: NaiveDateTime) -> Result<Booking> {
        let mut tx = self.begin().await?;

        // Условный UPDATE: из двух параллельных отмен строку получит только одна
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET booking_status = 'cancelled', updated_at = $2
            WHERE booking_id = $1 AND booking_status <> 'cancelled'
            RETURNING booking_id, user_id, screening_id, booking_number, num_tickets, total_amount,
                      booking_status, payment_status, booking_date
            "#,
        )
        .bind(booking_id)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let _ = tx.rollback().await;
            return if self.booking_exists(booking_id).await? {
                Err(StoreError::AlreadyCancelled(booking_id))
            } else {
                Err(StoreError::BookingNotFound(booking_id))
            };
        };

        let released = sqlx::query(
            r#"
            UPDATE seat_bookings
            SET released_at = $2
            WHERE booking_id = $1 AND released_at IS NULL
            "#,
        )
        .bind(booking_id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("booking {} cancelled, {} seat claims released", booking_id, released.rows_affected());
        Ok(Booking::try_from(row)?)
    }

    async fn mark_paid(&self, booking_id: BookingId, at: NaiveDateTime) -> Result<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET payment_status = 'paid', updated_at = $2
            WHERE booking_id = $1 AND booking_status <> 'cancelled'
            RETURNING booking_id, user_id, screening_id, booking_number, num_tickets, total_amount,
                      booking_status, payment_status, booking_date
            "#,
        )
        .bind(booking_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Booking::try_from(row)?),
            None if self.booking_exists(booking_id).await? => {
                Err(StoreError::AlreadyCancelled(booking_id))
            }
            None => Err(StoreError::BookingNotFound(booking_id)),
        }
    }

    async fn deactivate_screening(&self, screening_id: ScreeningId, at: NaiveDateTime) -> Result<u64> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query("UPDATE screenings SET is_active = FALSE WHERE screening_id = $1")
            .bind(screening_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Err(StoreError::ScreeningNotFound(screening_id));
        }

        let cancelled = sqlx::query(
            r#"
            UPDATE bookings
            SET booking_status = 'cancelled', updated_at = $2
            WHERE screening_id = $1 AND booking_status <> 'cancelled'
            "#,
        )
        .bind(screening_id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE seat_bookings
            SET released_at = $2
            WHERE screening_id = $1 AND released_at IS NULL
            "#,
        )
        .bind(screening_id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        if let Err(e) = tx.commit().await {
            warn!("failed to commit deactivation of screening {}: {:?}", screening_id, e);
            return Err(e.into());
        }

        Ok(cancelled.rows_affected())
    }
}
