pub mod screening;
pub mod seat;
pub mod booking;

pub use screening::Screening;
pub use seat::{Seat, SeatType};
pub use booking::{Booking, BookingStatus, PaymentStatus, SeatClaim};

pub type UserId = i64;
pub type HallId = i64;
pub type ScreeningId = i64;
pub type SeatId = i64;
pub type BookingId = i64;
