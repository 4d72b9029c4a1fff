//! Background [`Task`]s definitions.

mod background;
pub mod dispatch_notifications;
pub mod outbox;
pub mod reconcile_pending_payments;

pub use common::Handler as Task;

pub use self::{
    background::{Background, Failed},
    dispatch_notifications::DispatchNotifications,
    outbox::{Inbox, Outbox},
    reconcile_pending_payments::ReconcilePendingPayments,
};
