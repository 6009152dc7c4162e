#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::sync::Arc;

use seat_ledger::clock::FixedClock;
use seat_ledger::config::BookingConfig;
use seat_ledger::models::{Screening, Seat, SeatId, SeatType};
use seat_ledger::services::ReservationLedger;
use seat_ledger::store::MemoryStore;

pub const HALL: i64 = 1;
pub const OTHER_HALL: i64 = 2;
pub const S1: i64 = 1;
pub const S2: i64 = 2;

pub const U1: i64 = 101;
pub const U2: i64 = 102;

// Зал 1: в ряду A три места, в ряду B VIP и выключенное место
pub const A1: SeatId = 1;
pub const A2: SeatId = 2;
pub const A3: SeatId = 3;
pub const B1: SeatId = 4;
pub const B2_INACTIVE: SeatId = 5;
pub const FOREIGN_SEAT: SeatId = 10;

pub fn showtime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 18)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
}

pub fn screening(screening_id: i64, starts_at: NaiveDateTime) -> Screening {
    Screening {
        screening_id,
        movie_id: 7,
        cinema_id: 3,
        hall_id: HALL,
        screening_date: starts_at.date(),
        start_time: starts_at.time(),
        end_time: Some(starts_at.time() + Duration::minutes(110)),
        ticket_price: Decimal::new(2000, 2),
        is_active: true,
    }
}

fn seat(seat_id: SeatId, hall_id: i64, row: i32, number: i32, seat_type: SeatType, multiplier: Decimal) -> Seat {
    Seat {
        seat_id,
        hall_id,
        row_number: row,
        seat_number: number,
        seat_type,
        price_multiplier: multiplier,
        is_active: true,
    }
}

pub fn store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_screening(screening(S1, showtime())).unwrap();
    store
        .add_screening(screening(S2, showtime() + Duration::days(1)))
        .unwrap();

    store.add_seat(seat(A1, HALL, 1, 1, SeatType::Standard, Decimal::ONE)).unwrap();
    store.add_seat(seat(A2, HALL, 1, 2, SeatType::Premium, Decimal::new(150, 2))).unwrap();
    store.add_seat(seat(A3, HALL, 1, 3, SeatType::Standard, Decimal::ONE)).unwrap();
    store.add_seat(seat(B1, HALL, 2, 1, SeatType::Vip, Decimal::new(200, 2))).unwrap();
    store.add_seat(seat(B2_INACTIVE, HALL, 2, 2, SeatType::Standard, Decimal::ONE)).unwrap();
    store.set_seat_active(B2_INACTIVE, false).unwrap();
    store
        .add_seat(seat(FOREIGN_SEAT, OTHER_HALL, 1, 1, SeatType::Standard, Decimal::ONE))
        .unwrap();

    Arc::new(store)
}

/// Леджер над свежим хранилищем; часы стоят за `lead` до начала S1.
pub fn ledger_at(lead: Duration) -> (ReservationLedger<MemoryStore>, Arc<MemoryStore>, FixedClock) {
    let store = store();
    let clock = FixedClock::new(showtime() - lead);
    let ledger = ReservationLedger::new(store.clone(), &BookingConfig::default()).with_clock(clock.clone());
    (ledger, store, clock)
}
