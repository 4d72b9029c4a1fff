//! [`Tenant`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xxhash_rust::xxh3;

use crate::domain::{
    booking::{self, guest, Guests},
    property, transaction, BookingRequest, Guest, Stay, Transaction,
};

/// Confirmed occupancy of a property, materialized out of a paid
/// [`BookingRequest`].
#[derive(Clone, Debug)]
pub struct Tenant {
    /// ID of this [`Tenant`].
    pub id: Id,

    /// Idempotency [`Key`] of this [`Tenant`].
    pub key: Key,

    /// ID of the occupied property.
    pub property_id: property::Id,

    /// ID of the [`BookingRequest`] this [`Tenant`] originates from.
    pub booking_request_id: booking::Id,

    /// [`Guest`] occupying the property.
    pub guest: Guest,

    /// Occupied [`Stay`].
    pub stay: Stay,

    /// Number of [`Guests`] staying.
    pub guests: Guests,

    /// [`Payment`] summary of this [`Tenant`].
    pub payment: Payment,

    /// [`Status`] of this [`Tenant`].
    pub status: Status,

    /// [`DateTime`] when this [`Tenant`] was created.
    pub created_at: CreationDateTime,
}

impl Tenant {
    /// Creates a new [`Status::Confirmed`] [`Tenant`] out of the provided
    /// [`BookingRequest`] and its successful [`Transaction`].
    #[must_use]
    pub fn confirm(
        booking: &BookingRequest,
        transaction: &Transaction,
    ) -> Self {
        let status = match transaction.kind {
            transaction::Kind::Full => PaymentStatus::Paid,
            transaction::Kind::Deposit => PaymentStatus::PartiallyPaid,
        };
        Self {
            id: Id::new(),
            key: Key::new(
                &booking.guest.email,
                &booking.property_id,
                &booking.stay.stay,
            ),
            property_id: booking.property_id.clone(),
            booking_request_id: booking.id,
            guest: booking.guest.clone(),
            stay: booking.stay.stay,
            guests: booking.stay.guests,
            payment: Payment {
                status,
                amount_paid: transaction.amount,
                total: booking.stay.total,
                transaction_reference: transaction.reference.clone(),
            },
            status: Status::Confirmed,
            created_at: DateTimeOf::now(),
        }
    }
}

/// ID of a [`Tenant`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Idempotency key of a [`Tenant`].
///
/// Identifies a tenancy by its guest, property and dates, so the same paid
/// booking is never materialized twice.
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Key(Uuid);

impl Key {
    /// Calculates a new [`Key`] for a [`Tenant`].
    #[must_use]
    pub fn new(
        email: &guest::Email,
        property_id: &property::Id,
        stay: &Stay,
    ) -> Self {
        use std::hash::Hash as _;

        // WARNING: Changing the order of the fields in the hasher breaks the
        //          uniqueness of already stored keys.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        email.hash(&mut hasher);
        property_id.hash(&mut hasher);
        stay.check_in().hash(&mut hasher);
        stay.check_out().hash(&mut hasher);

        Self(Uuid::from_u128(hasher.digest128()))
    }
}

/// Payment summary of a [`Tenant`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payment {
    /// [`PaymentStatus`] of the [`Tenant`].
    pub status: PaymentStatus,

    /// Amount paid so far.
    pub amount_paid: Money,

    /// Total price of the stay.
    pub total: Money,

    /// [`transaction::Reference`] of the settling [`Transaction`].
    pub transaction_reference: transaction::Reference,
}

define_kind! {
    #[doc = "Payment status of a `Tenant`."]
    enum PaymentStatus {
        #[doc = "Whole price is paid."]
        Paid = 1,

        #[doc = "Only a deposit is paid."]
        PartiallyPaid = 2,
    }
}

define_kind! {
    #[doc = "Status of a `Tenant`."]
    enum Status {
        #[doc = "Occupancy is confirmed."]
        Confirmed = 1,

        #[doc = "Occupancy is cancelled."]
        Cancelled = 2,
    }
}

/// [`DateTime`] when a [`Tenant`] was created.
pub type CreationDateTime = DateTimeOf<(Tenant, unit::Creation)>;

#[cfg(test)]
mod spec {
    use crate::domain::{booking::guest::Email, property, stay::spec::stay};

    use super::Key;

    #[test]
    fn key_identifies_tenancy() {
        let email = Email::new("ada@example.com").unwrap();
        let shouty = Email::new("ADA@example.com").unwrap();
        let property = property::Id::new("lekki-loft").unwrap();
        let other = property::Id::new("ikoyi-suite").unwrap();
        let march = stay("2025-03-01", "2025-03-05");

        assert_eq!(
            Key::new(&email, &property, &march),
            Key::new(&shouty, &property, &march),
        );
        assert_ne!(
            Key::new(&email, &property, &march),
            Key::new(&email, &other, &march),
        );
        assert_ne!(
            Key::new(&email, &property, &march),
            Key::new(&email, &property, &stay("2025-03-01", "2025-03-06")),
        );
    }
}
