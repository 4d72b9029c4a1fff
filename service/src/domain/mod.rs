//! Domain definitions.

pub mod booking;
pub mod discount;
pub mod notification;
pub mod property;
pub mod stay;
pub mod tenant;
pub mod transaction;

pub use self::{
    booking::{BookingRequest, Guest},
    discount::DiscountCode,
    notification::Notification,
    property::Property,
    stay::Stay,
    tenant::Tenant,
    transaction::Transaction,
};
