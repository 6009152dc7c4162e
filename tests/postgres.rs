//! Тесты против настоящего Postgres. Запуск:
//! `DATABASE_URL=postgres://... cargo test --test postgres -- --ignored`

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use seat_ledger::clock::FixedClock;
use seat_ledger::config::{BookingConfig, DatabaseConfig};
use seat_ledger::database::Database;
use seat_ledger::error::{BookingError, ErrorKind};
use seat_ledger::models::{BookingStatus, SeatId};
use seat_ledger::services::ReservationLedger;
use seat_ledger::store::{PgStore, ReservationStore};

struct Fixture {
    ledger: ReservationLedger<PgStore>,
    store: Arc<PgStore>,
    screening_id: i64,
    seats: Vec<SeatId>,
    users: Vec<i64>,
}

fn showtime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 1, 15).unwrap().and_hms_opt(20, 0, 0).unwrap()
}

async fn fixture(users: usize) -> Fixture {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::new(&DatabaseConfig {
        url,
        pool_size: 20,
        acquire_timeout_seconds: 5,
        statement_timeout_ms: 5000,
    })
    .await
    .unwrap();
    db.run_migrations().await.unwrap();

    // Свой зал на каждый прогон, чтобы тесты не мешали друг другу
    let hall_id = (Uuid::new_v4().as_u128() % 1_000_000_000) as i64;

    let screening_id: i64 = sqlx::query_scalar(
        "INSERT INTO screenings (movie_id, cinema_id, hall_id, screening_date, start_time, ticket_price)
         VALUES (1, 1, $1, $2, $3, $4)
         RETURNING screening_id",
    )
    .bind(hall_id)
    .bind(showtime().date())
    .bind(showtime().time())
    .bind(Decimal::new(2000, 2))
    .fetch_one(&db.pool)
    .await
    .unwrap();

    let mut seats = Vec::new();
    for (row, number, multiplier) in [(1, 1, Decimal::ONE), (1, 2, Decimal::new(150, 2)), (1, 3, Decimal::ONE)] {
        let seat_id: i64 = sqlx::query_scalar(
            "INSERT INTO seats (hall_id, row_number, seat_number, price_multiplier)
             VALUES ($1, $2, $3, $4)
             RETURNING seat_id",
        )
        .bind(hall_id)
        .bind(row)
        .bind(number)
        .bind(multiplier)
        .fetch_one(&db.pool)
        .await
        .unwrap();
        seats.push(seat_id);
    }

    let hash = bcrypt::hash("secret", 4).unwrap();
    let mut user_ids = Vec::new();
    for _ in 0..users {
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING user_id",
        )
        .bind(format!("{}@cinema.test", Uuid::new_v4()))
        .bind(&hash)
        .fetch_one(&db.pool)
        .await
        .unwrap();
        user_ids.push(user_id);
    }

    let store = Arc::new(PgStore::new(&db, 5000));
    let ledger = ReservationLedger::new(store.clone(), &BookingConfig::default())
        .with_clock(FixedClock::new(showtime() - Duration::hours(10)));

    Fixture { ledger, store, screening_id, seats, users: user_ids }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn one_winner_per_seat_in_postgres() {
    let fx = fixture(12).await;
    let ledger = Arc::new(fx.ledger);
    let seat = fx.seats[0];

    let handles: Vec<_> = fx
        .users
        .iter()
        .map(|user| {
            let (ledger, user, screening) = (ledger.clone(), *user, fx.screening_id);
            tokio::spawn(async move { ledger.create_booking(user, screening, &[seat]).await })
        })
        .collect();

    let mut winners = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => winners += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::SeatUnavailable, "{err}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(fx.store.claimed_seat_ids(fx.screening_id).await.unwrap(), vec![seat]);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn cancellation_releases_and_allows_rebooking() {
    let fx = fixture(2).await;
    let (u1, u2) = (fx.users[0], fx.users[1]);

    let view = fx
        .ledger
        .create_booking(u1, fx.screening_id, &fx.seats[..2])
        .await
        .unwrap();
    assert_eq!(view.booking.total_amount, Decimal::new(5000, 2));

    let cancelled = fx.ledger.cancel_booking(view.booking.booking_id, u1).await.unwrap();
    assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);

    let again = fx.ledger.cancel_booking(view.booking.booking_id, u1).await.unwrap_err();
    assert!(matches!(again, BookingError::AlreadyCancelled(_)));

    // Частичный уникальный индекс не мешает новой брони на освобождённые места
    fx.ledger
        .create_booking(u2, fx.screening_id, &fx.seats[..2])
        .await
        .unwrap();

    let history = fx.store.claims_for_booking(view.booking.booking_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|c| c.released_at.is_some()));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn duplicate_booking_number_is_retried() {
    let fx = fixture(2).await;
    let taken = format!("BKG-20300115-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase());
    let fresh = format!("BKG-20300115-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase());

    let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls = counter.clone();
    let ledger = fx.ledger.with_booking_numbers(move |_at: NaiveDateTime| {
        if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
            taken.clone()
        } else {
            fresh.clone()
        }
    });

    let first = ledger.create_booking(fx.users[0], fx.screening_id, &[fx.seats[0]]).await.unwrap();
    let second = ledger.create_booking(fx.users[1], fx.screening_id, &[fx.seats[1]]).await.unwrap();

    assert_ne!(first.booking.booking_number, second.booking.booking_number);
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn deactivation_cascades_in_postgres() {
    let fx = fixture(2).await;
    fx.ledger.create_booking(fx.users[0], fx.screening_id, &[fx.seats[0]]).await.unwrap();
    fx.ledger.create_booking(fx.users[1], fx.screening_id, &[fx.seats[1]]).await.unwrap();

    assert_eq!(fx.ledger.deactivate_screening(fx.screening_id).await.unwrap(), 2);
    assert!(fx.store.claimed_seat_ids(fx.screening_id).await.unwrap().is_empty());

    let err = fx.ledger.seat_map(fx.screening_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
