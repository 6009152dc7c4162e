//! Расчёт стоимости мест.
//!
//! Цена места = базовая цена сеанса × коэффициент места, с округлением до
//! копеек по правилу half-up. Итог брони равен сумме уже округлённых цен мест.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Seat;

pub const CURRENCY_SCALE: u32 = 2;

pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn seat_price(base_price: Decimal, seat: &Seat) -> Decimal {
    round_currency(base_price * seat.price_multiplier)
}

pub fn total_price<'a, I>(base_price: Decimal, seats: I) -> Decimal
where
    I: IntoIterator<Item = &'a Seat>,
{
    seats
        .into_iter()
        .map(|seat| seat_price(base_price, seat))
        .sum()
}
