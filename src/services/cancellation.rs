//! Политика отмены броней.
//!
//! Отменить бронь можно, пока до начала сеанса остаётся не меньше
//! минимального запаса времени (по умолчанию 2 часа). Ровно 120 минут ещё
//! разрешены, 119 уже нет.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::{BookingError, Result};
use crate::models::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    min_lead: Duration,
}

/// Результат предварительной проверки для списка броней пользователя.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelPreview {
    pub can_cancel: bool,
    pub cancel_reason: String,
}

impl CancellationPolicy {
    pub fn new(min_lead: Duration) -> Self {
        Self { min_lead }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn min_lead(&self) -> Duration {
        self.min_lead
    }

    /// Последний момент, когда отмена ещё разрешена.
    pub fn deadline(&self, starts_at: NaiveDateTime) -> NaiveDateTime {
        starts_at - self.min_lead
    }

    pub fn check(&self, starts_at: NaiveDateTime, now: NaiveDateTime) -> Result<()> {
        let lead = starts_at - now;
        if lead < self.min_lead {
            return Err(BookingError::TooLateToCancel {
                minutes_remaining: lead.num_minutes().max(0),
                minimum_minutes: self.min_lead.num_minutes(),
            });
        }
        Ok(())
    }

    pub fn preview(&self, booking: &Booking, starts_at: NaiveDateTime, now: NaiveDateTime) -> CancelPreview {
        if booking.is_cancelled() {
            return CancelPreview {
                can_cancel: false,
                cancel_reason: "Booking is already cancelled".to_string(),
            };
        }

        match self.check(starts_at, now) {
            Ok(()) => CancelPreview {
                can_cancel: true,
                cancel_reason: format!(
                    "Free cancellation until {}",
                    self.deadline(starts_at).format("%Y-%m-%d %H:%M")
                ),
            },
            Err(BookingError::TooLateToCancel { .. }) if starts_at <= now => CancelPreview {
                can_cancel: false,
                cancel_reason: "Screening has already started".to_string(),
            },
            Err(BookingError::TooLateToCancel { minutes_remaining, minimum_minutes }) => CancelPreview {
                can_cancel: false,
                cancel_reason: format!(
                    "Cancellation closes {minimum_minutes} minutes before showtime ({minutes_remaining} minutes remain)"
                ),
            },
            Err(other) => CancelPreview { can_cancel: false, cancel_reason: other.to_string() },
        }
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::from_minutes(120)
    }
}
