use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{HallId, ScreeningId};

/// Один сеанс фильма в конкретном зале.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Screening {
    pub screening_id: ScreeningId,
    pub movie_id: i64,
    pub cinema_id: i64,
    pub hall_id: HallId,
    pub screening_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub ticket_price: Decimal,
    pub is_active: bool,
}

impl Screening {
    /// Момент начала сеанса (локальное время кинотеатра).
    pub fn starts_at(&self) -> NaiveDateTime {
        self.screening_date.and_time(self.start_time)
    }
}
