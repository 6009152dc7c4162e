pub mod availability;
pub mod cancellation;
pub mod catalog;
pub mod ledger;
pub mod pricing;

pub use ledger::{BookedSeat, BookingView, ReservationLedger};
