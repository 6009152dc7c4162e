use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::{HallId, SeatId};

/// Класс места. Отсутствующий класс в БД трактуется как `Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    #[default]
    Standard,
    Premium,
    Vip,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Standard => "standard",
            SeatType::Premium => "premium",
            SeatType::Vip => "vip",
        }
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(SeatType::Standard),
            "premium" => Ok(SeatType::Premium),
            "vip" => Ok(SeatType::Vip),
            _ => Err(UnknownValue::new("seat_type", s)),
        }
    }
}

/// Значение из БД, которое не соответствует ни одному варианту перечисления.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {column} value: {value:?}")]
pub struct UnknownValue {
    pub column: &'static str,
    pub value: String,
}

impl UnknownValue {
    pub fn new(column: &'static str, value: &str) -> Self {
        Self { column, value: value.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_id: SeatId,
    pub hall_id: HallId,
    pub row_number: i32,
    pub seat_number: i32,
    pub seat_type: SeatType,
    pub price_multiplier: Decimal,
    pub is_active: bool,
}

impl Seat {
    pub const STANDARD_MULTIPLIER: Decimal = Decimal::ONE;

    /// Человекочитаемая метка места: буква ряда + номер (`A1`, `B12`).
    /// Ряды после `Z` продолжаются как `AA`, `AB`, ...
    pub fn label(&self) -> String {
        format!("{}{}", row_letters(self.row_number), self.seat_number)
    }
}

fn row_letters(row_number: i32) -> String {
    if row_number < 1 {
        return row_number.to_string();
    }
    let mut n = row_number as u32;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// Строка таблицы seats как она лежит в БД
#[derive(Debug, Clone, FromRow)]
pub struct SeatRow {
    pub seat_id: i64,
    pub hall_id: i64,
    pub row_number: i32,
    pub seat_number: i32,
    pub seat_type: Option<String>,
    pub price_multiplier: Option<Decimal>,
    pub is_active: bool,
}

impl TryFrom<SeatRow> for Seat {
    type Error = UnknownValue;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        let seat_type = match row.seat_type.as_deref() {
            None | Some("") => SeatType::default(),
            Some(s) => s.parse()?,
        };
        Ok(Seat {
            seat_id: row.seat_id,
            hall_id: row.hall_id,
            row_number: row.row_number,
            seat_number: row.seat_number,
            seat_type,
            price_multiplier: row.price_multiplier.unwrap_or(Seat::STANDARD_MULTIPLIER),
            is_active: row.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(seat_type: Option<&str>, multiplier: Option<Decimal>) -> SeatRow {
        SeatRow {
            seat_id: 7,
            hall_id: 1,
            row_number: 2,
            seat_number: 12,
            seat_type: seat_type.map(str::to_string),
            price_multiplier: multiplier,
            is_active: true,
        }
    }

    #[test]
    fn label_uses_row_letter() {
        let seat = Seat::try_from(row(None, None)).unwrap();
        assert_eq!(seat.label(), "B12");
    }

    #[test]
    fn rows_past_z_roll_over() {
        assert_eq!(row_letters(1), "A");
        assert_eq!(row_letters(26), "Z");
        assert_eq!(row_letters(27), "AA");
        assert_eq!(row_letters(28), "AB");
    }

    #[test]
    fn missing_class_defaults_to_standard_pricing() {
        let seat = Seat::try_from(row(None, None)).unwrap();
        assert_eq!(seat.seat_type, SeatType::Standard);
        assert_eq!(seat.price_multiplier, Decimal::ONE);
    }

    #[test]
    fn seat_type_is_case_insensitive() {
        let seat = Seat::try_from(row(Some("VIP"), Some(Decimal::new(200, 2)))).unwrap();
        assert_eq!(seat.seat_type, SeatType::Vip);
        assert_eq!(seat.price_multiplier, Decimal::new(2, 0));
    }

    #[test]
    fn unknown_class_is_rejected() {
        let err = Seat::try_from(row(Some("balcony"), None)).unwrap_err();
        assert_eq!(err.column, "seat_type");
        assert_eq!(err.value, "balcony");
    }
}
