//! [`Command`] definition.

pub mod create_booking_request;
pub mod initialize_payment;
pub mod use_discount_code;
pub mod verify_payment;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_booking_request::CreateBookingRequest,
    initialize_payment::InitializePayment, use_discount_code::UseDiscountCode,
    verify_payment::VerifyPayment,
};
