//! [`Notification`] definitions.

use common::{Date, Money};
use serde::Serialize;

use crate::domain::{
    booking::{self, guest},
    property, tenant, transaction, BookingRequest, Tenant, Transaction,
};

/// Event worth telling the guest or administrators about.
///
/// Serialized as `{"kind": ..., "payload": {...}}`.
#[derive(Clone, Debug, Serialize)]
#[serde(
    tag = "kind",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Notification {
    /// New [`BookingRequest`] was submitted.
    BookingRequested {
        /// ID of the [`BookingRequest`].
        booking_id: booking::Id,

        /// ID of the booked property.
        property_id: property::Id,

        /// Name of the guest.
        guest_name: guest::Name,

        /// Email of the guest.
        guest_email: guest::Email,

        /// Check-in [`Date`].
        check_in: Date,

        /// Check-out [`Date`].
        check_out: Date,

        /// Amount to be paid.
        total: Money,
    },

    /// [`Transaction`] was paid.
    PaymentSucceeded {
        /// [`transaction::Reference`] of the [`Transaction`].
        reference: transaction::Reference,

        /// ID of the paid [`BookingRequest`].
        booking_id: booking::Id,

        /// Email of the paying customer.
        customer_email: guest::Email,

        /// Paid amount.
        amount: Money,
    },

    /// [`Transaction`] failed.
    PaymentFailed {
        /// [`transaction::Reference`] of the [`Transaction`].
        reference: transaction::Reference,

        /// ID of the unpaid [`BookingRequest`].
        booking_id: booking::Id,

        /// Email of the paying customer.
        customer_email: guest::Email,

        /// Reason of the failure.
        reason: String,
    },

    /// [`Tenant`] was created.
    TenancyConfirmed {
        /// ID of the [`Tenant`].
        tenant_id: tenant::Id,

        /// ID of the converted [`BookingRequest`].
        booking_id: booking::Id,

        /// ID of the occupied property.
        property_id: property::Id,

        /// Email of the guest.
        guest_email: guest::Email,

        /// Check-in [`Date`].
        check_in: Date,

        /// Check-out [`Date`].
        check_out: Date,
    },
}

impl Notification {
    /// Returns the name of this [`Notification`] kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BookingRequested { .. } => "booking_requested",
            Self::PaymentSucceeded { .. } => "payment_succeeded",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::TenancyConfirmed { .. } => "tenancy_confirmed",
        }
    }

    /// Creates a [`Notification::BookingRequested`].
    #[must_use]
    pub fn booking_requested(booking: &BookingRequest) -> Self {
        Self::BookingRequested {
            booking_id: booking.id,
            property_id: booking.property_id.clone(),
            guest_name: booking.guest.name.clone(),
            guest_email: booking.guest.email.clone(),
            check_in: booking.stay.stay.check_in(),
            check_out: booking.stay.stay.check_out(),
            total: booking.stay.total,
        }
    }

    /// Creates a [`Notification`] about the settled [`Transaction`].
    ///
    /// [`None`] is returned if the [`Transaction`] is still pending.
    #[must_use]
    pub fn payment_settled(transaction: &Transaction) -> Option<Self> {
        let reference = transaction.reference.clone();
        let booking_id = transaction.booking_request_id;
        let customer_email = transaction.customer.email.clone();
        match transaction.status {
            transaction::Status::Success => Some(Self::PaymentSucceeded {
                reference,
                booking_id,
                customer_email,
                amount: transaction.amount,
            }),
            transaction::Status::Failed => Some(Self::PaymentFailed {
                reference,
                booking_id,
                customer_email,
                reason: transaction
                    .failure_reason
                    .clone()
                    .unwrap_or_default(),
            }),
            transaction::Status::Pending => None,
        }
    }

    /// Creates a [`Notification::TenancyConfirmed`].
    #[must_use]
    pub fn tenancy_confirmed(tenant: &Tenant) -> Self {
        Self::TenancyConfirmed {
            tenant_id: tenant.id,
            booking_id: tenant.booking_request_id,
            property_id: tenant.property_id.clone(),
            guest_email: tenant.guest.email.clone(),
            check_in: tenant.stay.check_in(),
            check_out: tenant.stay.check_out(),
        }
    }
}

#[cfg(test)]
mod spec {
    use serde_json::json;

    use crate::domain::transaction::{self, spec::pending};

    use super::Notification;

    #[test]
    fn serializes_with_kind_and_payload() {
        let mut tx = pending();
        tx.fail("Declined".into(), None, None).unwrap();

        let notification = Notification::payment_settled(&tx).unwrap();
        assert_eq!(notification.kind(), "payment_failed");

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["kind"], json!("payment_failed"));
        assert_eq!(json["payload"]["reason"], json!("Declined"));
        assert_eq!(
            json["payload"]["reference"],
            json!(tx.reference.to_string()),
        );
        assert_eq!(json["payload"]["customerEmail"], json!("ada@example.com"));
    }

    #[test]
    fn pending_payments_are_silent() {
        let tx = pending();

        assert_eq!(tx.status, transaction::Status::Pending);
        assert!(Notification::payment_settled(&tx).is_none());
    }
}
