//! Ошибки леджера броней.
//!
//! Все ошибки возвращаются вызывающему коду как значения; слой маршрутов сам
//! решает, какой HTTP-статус и текст показать пользователю.

use serde::Serialize;

use crate::models::{BookingId, ScreeningId, SeatId};
use crate::store::StoreError;

/// Место, которое успели занять раньше.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TakenSeat {
    pub seat_id: SeatId,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Forbidden,
    SeatUnavailable,
    AlreadyCancelled,
    TooLateToCancel,
    PersistenceFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("screening {0} not found")]
    ScreeningNotFound(ScreeningId),

    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("booking belongs to another user")]
    Forbidden,

    #[error("seats no longer available: {}", labels(.seats))]
    SeatUnavailable { seats: Vec<TakenSeat> },

    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    #[error(
        "cancellation closes {minimum_minutes} minutes before showtime, {minutes_remaining} minutes remain"
    )]
    TooLateToCancel { minutes_remaining: i64, minimum_minutes: i64 },

    #[error("storage failure: {0}")]
    Persistence(String),
}

fn labels(seats: &[TakenSeat]) -> String {
    seats
        .iter()
        .map(|s| s.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BookingError::ScreeningNotFound(_) | BookingError::BookingNotFound(_) => ErrorKind::NotFound,
            BookingError::Forbidden => ErrorKind::Forbidden,
            BookingError::SeatUnavailable { .. } => ErrorKind::SeatUnavailable,
            BookingError::AlreadyCancelled(_) => ErrorKind::AlreadyCancelled,
            BookingError::TooLateToCancel { .. } => ErrorKind::TooLateToCancel,
            BookingError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }

    /// Повтор имеет смысл только после сбоя хранилища.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::PersistenceFailure
    }

    /// Подробности для UI, чтобы объяснить отказ без второго запроса.
    pub fn detail(&self) -> serde_json::Value {
        match self {
            BookingError::SeatUnavailable { seats } => serde_json::json!({ "seats": seats }),
            BookingError::TooLateToCancel { minutes_remaining, minimum_minutes } => serde_json::json!({
                "minutes_remaining": minutes_remaining,
                "minimum_minutes": minimum_minutes,
            }),
            _ => serde_json::Value::Null,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatsTaken(ids) => BookingError::SeatUnavailable {
                seats: ids
                    .into_iter()
                    .map(|seat_id| TakenSeat { seat_id, label: format!("#{seat_id}") })
                    .collect(),
            },
            StoreError::ScreeningNotFound(id) => BookingError::ScreeningNotFound(id),
            StoreError::BookingNotFound(id) => BookingError::BookingNotFound(id),
            StoreError::AlreadyCancelled(id) => BookingError::AlreadyCancelled(id),
            other => BookingError::Persistence(other.to_string()),
        }
    }
}

pub type Result<T, E = BookingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_unavailable_names_seats() {
        let err = BookingError::SeatUnavailable {
            seats: vec![
                TakenSeat { seat_id: 2, label: "A2".to_string() },
                TakenSeat { seat_id: 9, label: "B4".to_string() },
            ],
        };
        assert_eq!(err.to_string(), "seats no longer available: A2, B4");
        assert_eq!(err.detail()["seats"][1]["label"], "B4");
    }

    #[test]
    fn too_late_carries_remaining_minutes() {
        let err = BookingError::TooLateToCancel { minutes_remaining: 45, minimum_minutes: 120 };
        assert_eq!(err.kind(), ErrorKind::TooLateToCancel);
        assert_eq!(err.detail()["minutes_remaining"], 45);
        assert!(err.to_string().contains("45 minutes remain"));
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(BookingError::Persistence("timeout".to_string()).is_retryable());
        assert!(!BookingError::SeatUnavailable { seats: vec![] }.is_retryable());
        assert!(!BookingError::AlreadyCancelled(1).is_retryable());
    }

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let err: BookingError = StoreError::AlreadyCancelled(4).into();
        assert_eq!(err.kind(), ErrorKind::AlreadyCancelled);

        let err: BookingError = StoreError::Unavailable("down".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);

        let err: BookingError = StoreError::DuplicateBookingNumber("BKG-1".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);

        let err: BookingError = StoreError::SeatsTaken(vec![3]).into();
        assert_eq!(err.kind(), ErrorKind::SeatUnavailable);
    }
}
