//! Read entities definitions.

pub mod reservation;
pub mod transaction;

pub use self::reservation::Reservation;
