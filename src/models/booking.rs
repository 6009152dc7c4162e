use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::seat::UnknownValue;
use super::{BookingId, ScreeningId, SeatId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(UnknownValue::new("booking_status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(UnknownValue::new("payment_status", s)),
        }
    }
}

/// Покупка одного пользователя на один сеанс.
///
/// `num_tickets` всегда равно числу записей `SeatClaim` этой брони.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub screening_id: ScreeningId,
    pub booking_number: String,
    pub num_tickets: i32,
    pub total_amount: Decimal,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub booking_date: NaiveDateTime,
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.booking_status == BookingStatus::Cancelled
    }

    /// Данные для QR-кода на билете.
    pub fn ticket_code(&self) -> String {
        format!("Booking:{}:{}:{}", self.booking_number, self.user_id, self.screening_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub booking_id: i64,
    pub user_id: i64,
    pub screening_id: i64,
    pub booking_number: String,
    pub num_tickets: i32,
    pub total_amount: Decimal,
    pub booking_status: String,
    pub payment_status: String,
    pub booking_date: NaiveDateTime,
}

impl TryFrom<BookingRow> for Booking {
    type Error = UnknownValue;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            booking_id: row.booking_id,
            user_id: row.user_id,
            screening_id: row.screening_id,
            booking_number: row.booking_number,
            num_tickets: row.num_tickets,
            total_amount: row.total_amount,
            booking_status: row.booking_status.parse()?,
            payment_status: row.payment_status.parse()?,
            booking_date: row.booking_date,
        })
    }
}

/// Запись о том, что место занято бронью на конкретный сеанс.
/// Пока `released_at` пуст, место недоступно для других броней.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SeatClaim {
    pub seat_booking_id: i64,
    pub booking_id: BookingId,
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub booking_date: NaiveDateTime,
    pub released_at: Option<NaiveDateTime>,
}

impl SeatClaim {
    pub fn is_live(&self) -> bool {
        self.released_at.is_none()
    }
}
