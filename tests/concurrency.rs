mod common;

use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

use common::*;
use seat_ledger::error::{BookingError, ErrorKind};
use seat_ledger::store::ReservationStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racers_for_one_seat_produce_one_booking() {
    let (ledger, store, _clock) = ledger_at(Duration::hours(10));
    let ledger = Arc::new(ledger);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.create_booking(1000 + i, S1, &[A1]).await })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let mut winners = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => winners += 1,
            Err(BookingError::SeatUnavailable { seats }) => {
                assert_eq!(seats.len(), 1);
                assert_eq!(seats[0].label, "A1");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(store.booking_count().unwrap(), 1);
    assert_eq!(store.claimed_seat_ids(S1).await.unwrap(), vec![A1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_requests_never_double_book() {
    let (ledger, store, _clock) = ledger_at(Duration::hours(10));
    let ledger = Arc::new(ledger);

    let requests: Vec<(i64, Vec<i64>)> = vec![
        (U1, vec![A1, A2]),
        (U2, vec![A2, A3]),
        (103, vec![A3, B1]),
        (104, vec![B1, A1]),
        (105, vec![A2]),
        (106, vec![B1]),
    ];

    let mut handles = Vec::new();
    for _round in 0..4 {
        for (user, seats) in &requests {
            let ledger = ledger.clone();
            let (user, seats) = (*user, seats.clone());
            handles.push(tokio::spawn(async move { ledger.create_booking(user, S1, &seats).await }));
        }
    }

    let mut claimed_by: HashMap<i64, i64> = HashMap::new();
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(view) => {
                for seat in &view.seats {
                    let previous = claimed_by.insert(seat.seat_id, view.booking.booking_id);
                    assert!(previous.is_none(), "seat {} booked twice", seat.label);
                }
            }
            Err(err) => assert_eq!(err.kind(), ErrorKind::SeatUnavailable),
        }
    }

    let mut live = store.claimed_seat_ids(S1).await.unwrap();
    live.sort_unstable();
    let mut expected: Vec<i64> = claimed_by.keys().copied().collect();
    expected.sort_unstable();
    assert_eq!(live, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_succeed_once() {
    let (ledger, store, _clock) = ledger_at(Duration::hours(10));
    let ledger = Arc::new(ledger);
    let view = ledger.create_booking(U1, S1, &[A1, A2]).await.unwrap();
    let booking_id = view.booking.booking_id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.cancel_booking(booking_id, U1).await })
        })
        .collect();

    let mut cancelled = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => cancelled += 1,
            Err(err) => assert!(matches!(err, BookingError::AlreadyCancelled(id) if id == booking_id)),
        }
    }

    assert_eq!(cancelled, 1);
    assert!(store.claimed_seat_ids(S1).await.unwrap().is_empty());
}
